use crate::core::Error;

/// Create hash by bcrypt
#[cfg(test)]
pub fn hash_password(password: &str, cost: u32) -> Result<String, Error> {
    Ok(bcrypt::hash(password, cost)?)
}

/// Verify the hash password using bcrypt
pub fn verify_password(password: &str, hashed_password: &str) -> Result<bool, Error> {
    Ok(bcrypt::verify(password, hashed_password)?)
}

// ========================// CredentialVerifier //======================== //

/// Decides whether a caller may run privileged room operations
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, credential: &str) -> bool;
}

/// Checks the credential against a bcrypt hash of the admin password.
///
/// Without a configured hash every credential is refused.
pub struct AdminPassword {
    hash: Option<String>,
}

impl AdminPassword {
    pub fn new(hash: Option<String>) -> Self {
        Self { hash }
    }
}

impl CredentialVerifier for AdminPassword {
    fn verify(&self, credential: &str) -> bool {
        let Some(hash) = &self.hash else {
            return false;
        };

        match verify_password(credential, hash) {
            Ok(matched) => matched,
            Err(e) => {
                tracing::error!("failed to verify admin credential: {}", e);
                false
            }
        }
    }
}

// ========================// tests //======================== //
