pub mod b64;
pub mod crypt;
pub mod envs;
