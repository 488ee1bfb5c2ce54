//! Encryption of OAuth tokens that leave the server inside the session cookie.

use config::crypt_config;

use crate::b64::{self, b64u_decode, b64u_encode};

mod config;

pub use config::ENCRYPT_KEY_ENV;

pub fn encrypt(data: impl AsRef<[u8]>) -> Result<String, Error> {
    let key = &crypt_config().encrypt_key;
    let data = simple_crypt::encrypt(data.as_ref(), key).map_err(Error::EncryptFailed)?;

    Ok(b64u_encode(data))
}

pub fn decrypt(data: &str) -> Result<String, Error> {
    let key = &crypt_config().encrypt_key;
    let data_decoded = b64u_decode(data).map_err(Error::DecodeFailed)?;
    let data = simple_crypt::decrypt(&data_decoded, key).map_err(Error::DecryptFailed)?;

    String::from_utf8(data).map_err(Error::StringConversionFailed)
}

#[derive(Debug)]
pub enum Error {
    EncryptFailed(anyhow::Error),
    DecryptFailed(anyhow::Error),
    DecodeFailed(b64::Error),
    StringConversionFailed(std::string::FromUtf8Error),
}

impl core::fmt::Display for Error {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::result::Result<(), core::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl std::error::Error for Error {}
