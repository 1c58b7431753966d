//! This file defines types that handle password validation and hashing.
//! `ValidatedPassword` wraps a string and ensures it has an acceptable length.
//! `PasswordHash` converts a `ValidatedPassword` into a salted and hashed password.

use std::{fmt::Display, ops::RangeInclusive};

use bcrypt::{BcryptError, hash, verify};

use crate::Error;

/// The allowed number of characters in a password.
const PASSWORD_LENGTH: RangeInclusive<usize> = 3..=100;

/// A password that has been validated, but not yet hashed.
///
/// This struct can be used to construct a [PasswordHash].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPassword(String);

impl ValidatedPassword {
    /// Create and validate a new password from a string.
    ///
    /// # Errors
    ///
    /// Returns an [Error::InvalidPassword] if the password is shorter than
    /// three or longer than one hundred characters.
    pub fn new(raw_password_string: &str) -> Result<Self, Error> {
        if PASSWORD_LENGTH.contains(&raw_password_string.chars().count()) {
            Ok(Self(raw_password_string.to_owned()))
        } else {
            Err(Error::InvalidPassword)
        }
    }

    /// Create a new `ValidatedPassword` without any validation.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because if an invalid password is provided it may cause incorrect behaviour but will not affect memory safety.
    pub fn new_unchecked(raw_password_string: &str) -> Self {
        Self(raw_password_string.to_owned())
    }
}

impl Display for ValidatedPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", str::repeat("*", 8))
    }
}

/// A salted and hashed password.
///
/// Does not implement `Serialize`, the hash never leaves the server.
#[derive(Debug, Clone, PartialEq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// The bcrypt cost used for new passwords in production.
    pub const DEFAULT_COST: u32 = 10;

    /// Create a hashed password from a validated password with the specified `cost`.
    ///
    /// `cost` increases the rounds of hashing and therefore the time needed to verify a password.
    /// Pass in [PasswordHash::DEFAULT_COST] to use the production cost.
    ///
    /// # Errors
    ///
    /// This function will return an error if the password could not be hashed.
    pub fn new(password: ValidatedPassword, cost: u32) -> Result<Self, Error> {
        match hash(&password.0, cost) {
            Ok(password_hash) => Ok(Self(password_hash)),
            Err(e) => Err(Error::HashingError(e.to_string())),
        }
    }

    /// Create a new `PasswordHash` without any validation.
    ///
    /// The caller should ensure that `raw_password_hash` is a valid password hash.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because if an invalid hash is provided it will cause incorrect behaviour but not affect memory safety.
    pub fn new_unchecked(raw_password_hash: &str) -> Self {
        Self(raw_password_hash.to_owned())
    }

    /// Try to create a password hash from a raw password string.
    ///
    /// This is a convenience function that removes the need to manually create
    /// the intermediate `ValidatedPassword` type.
    pub fn from_raw_password(raw_password: &str, cost: u32) -> Result<Self, Error> {
        let validated_password = ValidatedPassword::new(raw_password)?;
        PasswordHash::new(validated_password, cost)
    }

    /// Check that `raw_password` matches the stored password.
    pub fn verify(&self, raw_password: &str) -> Result<bool, BcryptError> {
        verify(raw_password, &self.0)
    }
}

impl AsRef<str> for PasswordHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod validated_password_tests {
    use crate::{Error, auth::ValidatedPassword};

    #[test]
    fn new_fails_on_empty() {
        assert_eq!(ValidatedPassword::new(""), Err(Error::InvalidPassword));
    }

    #[test]
    fn new_fails_on_short_password() {
        assert_eq!(ValidatedPassword::new("ab"), Err(Error::InvalidPassword));
    }

    #[test]
    fn new_fails_on_long_password() {
        let password = "a".repeat(101);

        assert_eq!(
            ValidatedPassword::new(&password),
            Err(Error::InvalidPassword)
        );
    }

    #[test]
    fn new_succeeds_at_length_limits() {
        assert!(ValidatedPassword::new("abc").is_ok());
        assert!(ValidatedPassword::new(&"a".repeat(100)).is_ok());
    }

    #[test]
    fn counts_characters_not_bytes() {
        // Three characters, nine bytes.
        assert!(ValidatedPassword::new("€€€").is_ok());
    }

    #[test]
    fn display_hides_password() {
        let password = ValidatedPassword::new_unchecked("hunter2");

        assert_eq!(password.to_string(), "********");
    }
}
