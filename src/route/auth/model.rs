use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Access level attached to an account.
///
/// Stored roles outside the known set deserialize as [`Role::Other`] rather
/// than failing the lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	Admin,
	Moderator,
	#[serde(other)]
	Other,
}

impl Role {
	/// Whether the role grants access to the admin panel.
	pub fn is_staff(self) -> bool {
		matches!(self, Self::Admin | Self::Moderator)
	}

	pub fn parse(value: &str) -> Option<Self> {
		match value {
			"admin" => Some(Self::Admin),
			"moderator" => Some(Self::Moderator),
			"other" => Some(Self::Other),
			_ => None,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Admin => "admin",
			Self::Moderator => "moderator",
			Self::Other => "other",
		}
	}
}

/// A stored account. The password is an argon2 PHC string and is never
/// serialized to clients or rendered in the admin panel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
	#[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
	pub id: Option<ObjectId>,
	pub username: String,
	pub password: String,
	pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
	pub username: String,
	pub password: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PasswordError {
	#[error("Password must be at least 8 characters long")]
	TooShort,
	#[error("Password must contain at least one uppercase letter")]
	NoUppercase,
	#[error("Password must contain at least one lowercase letter")]
	NoLowercase,
	#[error("Password must contain at least one number")]
	NoDigit,
	#[error("Password must contain at least one special character")]
	NoSpecial,
}

const SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Checks the five account-password complexity rules.
pub fn validate_password_complexity(password: &str) -> Result<(), PasswordError> {
	if password.chars().count() < 8 {
		return Err(PasswordError::TooShort);
	}

	if !password.chars().any(|c| c.is_ascii_uppercase()) {
		return Err(PasswordError::NoUppercase);
	}

	if !password.chars().any(|c| c.is_ascii_lowercase()) {
		return Err(PasswordError::NoLowercase);
	}

	if !password.chars().any(|c| c.is_ascii_digit()) {
		return Err(PasswordError::NoDigit);
	}

	if !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
		return Err(PasswordError::NoSpecial);
	}

	Ok(())
}

#[cfg(test)]
mod test {
	use super::{validate_password_complexity, PasswordError, Role};

	#[test]
	fn accepts_a_compliant_password() {
		assert_eq!(validate_password_complexity("Secure123!"), Ok(()));
	}

	#[test]
	fn each_rule_is_enforced_individually() {
		assert_eq!(
			validate_password_complexity("Ab1!"),
			Err(PasswordError::TooShort)
		);
		assert_eq!(
			validate_password_complexity("alllowercase1!"),
			Err(PasswordError::NoUppercase)
		);
		assert_eq!(
			validate_password_complexity("ALLUPPERCASE1!"),
			Err(PasswordError::NoLowercase)
		);
		assert_eq!(
			validate_password_complexity("NoDigitsHere!"),
			Err(PasswordError::NoDigit)
		);
		assert_eq!(
			validate_password_complexity("NoSpecial123"),
			Err(PasswordError::NoSpecial)
		);
	}

	#[test]
	fn unknown_stored_roles_fold_to_other() {
		let role: Role = serde_json::from_str(r#""superuser""#).unwrap();
		assert_eq!(role, Role::Other);

		let role: Role = serde_json::from_str(r#""moderator""#).unwrap();
		assert_eq!(role, Role::Moderator);
	}
}
