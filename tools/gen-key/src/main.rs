use lib_utils::b64::{b64_encode, b64u_encode};
use rand::RngCore;

fn random_key() -> [u8; 64] {
    let mut key = [0u8; 64];
    rand::thread_rng().fill_bytes(&mut key);
    key
}

fn main() {
    println!("\nSERVICE_ENCRYPT_KEY (b64u):\n{}", b64u_encode(random_key()));
    println!("\nJWT_SECRET (base64):\n{}", b64_encode(random_key()));
}
