//! Admin password hashing command.
//!
//! Prints an Argon2id PHC string suitable for `ADMIN_PASSWORD_HASH`.

use std::io::BufRead;

use thiserror::Error;

use orbit_server::services::auth::{AuthError, hash_password};

/// Errors that can occur while hashing.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// Reading the password from stdin failed.
    #[error("Failed to read password: {0}")]
    Io(#[from] std::io::Error),

    /// The password was empty.
    #[error("Password must not be empty")]
    Empty,

    /// Hashing failed.
    #[error("{0}")]
    Hash(#[from] AuthError),
}

/// Hash `password`, or a line read from stdin, and print the hash.
///
/// # Errors
///
/// Returns an error if stdin cannot be read, the password is empty, or
/// hashing fails.
pub fn hash(password: Option<String>) -> Result<(), PasswordError> {
    let password = match password {
        Some(password) => password,
        None => {
            tracing::info!("Enter the admin password, then press Enter:");
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line)?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    let hash = hash_of(&password)?;

    #[allow(clippy::print_stdout)]
    {
        println!("{hash}");
    }

    Ok(())
}

fn hash_of(password: &str) -> Result<String, PasswordError> {
    if password.is_empty() {
        return Err(PasswordError::Empty);
    }
    Ok(hash_password(password)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_argon2_phc() {
        let hash = hash_of("orbit").unwrap_or_default();
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn test_empty_password_rejected() {
        assert!(matches!(hash_of(""), Err(PasswordError::Empty)));
    }
}
