use tokio::task;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("bcrypt: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),
    #[error("hashing task failed: {0}")]
    Join(#[from] task::JoinError),
}

/// bcrypt is deliberately slow, so hashing runs on the blocking pool.
pub async fn hash_password(plain: &str, cost: u32) -> Result<String, PasswordError> {
    let plain = plain.to_string();
    let hash = task::spawn_blocking(move || bcrypt::hash(plain, cost)).await??;
    Ok(hash)
}

pub async fn verify_password(plain: &str, hash: &str) -> Result<bool, PasswordError> {
    let plain = plain.to_string();
    let hash = hash.to_string();
    let ok = task::spawn_blocking(move || bcrypt::verify(plain, &hash)).await??;
    Ok(ok)
}
