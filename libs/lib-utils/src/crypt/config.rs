use crate::envs::{self, get_env_b64u_as_u8s};
use std::sync::OnceLock;

pub const ENCRYPT_KEY_ENV: &str = "SERVICE_ENCRYPT_KEY";

pub fn crypt_config() -> &'static CryptConfig {
    static INSTANCE: OnceLock<CryptConfig> = OnceLock::new();

    INSTANCE.get_or_init(|| {
        CryptConfig::load_from_env()
            .unwrap_or_else(|ex| panic!("FATAL - WHILE LOADING CRYPT CONF - Cause: {ex:?}"))
    })
}

pub struct CryptConfig {
    pub encrypt_key: Vec<u8>,
}

impl CryptConfig {
    fn load_from_env() -> envs::Result<CryptConfig> {
        Ok(CryptConfig {
            encrypt_key: get_env_b64u_as_u8s(ENCRYPT_KEY_ENV)?,
        })
    }
}
