use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

pub const CREDIT_CARD_EXPIRATION_DATE: &str = "creditCardExpirationDate";
pub const CREDIT_CARD_EXPIRATION_DAY: &str = "creditCardExpirationDay";
pub const CREDIT_CARD_EXPIRATION_MONTH: &str = "creditCardExpirationMonth";
pub const CREDIT_CARD_EXPIRATION_YEAR: &str = "creditCardExpirationYear";
pub const CREDIT_CARD_NUMBER: &str = "creditCardNumber";
pub const CREDIT_CARD_SECURITY_CODE: &str = "creditCardSecurityCode";
pub const EMAIL_ADDRESS: &str = "emailAddress";
pub const PHONE: &str = "phone";
pub const NAME: &str = "name";
pub const PASSWORD: &str = "password";
pub const POSTAL_ADDRESS: &str = "postalAddress";
pub const POSTAL_CODE: &str = "postalCode";
pub const USERNAME: &str = "username";

const SUPPORTED_HINTS: [&str; 13] = [
    CREDIT_CARD_EXPIRATION_DATE,
    CREDIT_CARD_EXPIRATION_DAY,
    CREDIT_CARD_EXPIRATION_MONTH,
    CREDIT_CARD_EXPIRATION_YEAR,
    CREDIT_CARD_NUMBER,
    CREDIT_CARD_SECURITY_CODE,
    EMAIL_ADDRESS,
    PHONE,
    NAME,
    PASSWORD,
    POSTAL_ADDRESS,
    POSTAL_CODE,
    USERNAME,
];

pub fn is_supported_hint(hint: &str) -> bool {
    SUPPORTED_HINTS.contains(&hint)
}

/// Keeps only the hints this service knows how to fill, preserving order.
pub fn filter_supported_hints(hints: &[String]) -> Vec<String> {
    hints
        .iter()
        .filter(|hint| is_supported_hint(hint))
        .cloned()
        .collect()
}

/// Guesses a supported hint from free text such as a view's hint text or
/// resource id. Case-insensitive substring match, first rule wins.
pub fn infer_hint(text: &str) -> Option<&'static str> {
    let text = text.to_lowercase();
    if text.contains("password") {
        Some(PASSWORD)
    } else if text.contains("username") || (text.contains("login") && text.contains("id")) {
        Some(USERNAME)
    } else if text.contains("email") {
        Some(EMAIL_ADDRESS)
    } else if text.contains("name") {
        Some(NAME)
    } else if text.contains("phone") {
        Some(PHONE)
    } else if text.contains("address") {
        Some(POSTAL_ADDRESS)
    } else if text.contains("zip") {
        Some(POSTAL_CODE)
    } else {
        None
    }
}

/// Kinds of data a form asks the host to offer saving, as host bit flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaveType(u32);

impl SaveType {
    pub const GENERIC: SaveType = SaveType(0x0);
    pub const PASSWORD: SaveType = SaveType(0x1);
    pub const ADDRESS: SaveType = SaveType(0x2);
    pub const CREDIT_CARD: SaveType = SaveType(0x4);
    pub const USERNAME: SaveType = SaveType(0x8);
    pub const EMAIL_ADDRESS: SaveType = SaveType(0x10);

    pub const fn from_bits(bits: u32) -> Self {
        SaveType(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: SaveType) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn remove(&mut self, other: SaveType) {
        self.0 &= !other.0;
    }

    /// Save type of a single field. A password clears email and username so a
    /// login form is offered as a credential rather than an address book entry.
    pub fn for_hints(hints: &[String]) -> Self {
        let mut save_type = SaveType::GENERIC;
        for hint in hints {
            match hint.as_str() {
                CREDIT_CARD_EXPIRATION_DATE
                | CREDIT_CARD_EXPIRATION_DAY
                | CREDIT_CARD_EXPIRATION_MONTH
                | CREDIT_CARD_EXPIRATION_YEAR
                | CREDIT_CARD_NUMBER
                | CREDIT_CARD_SECURITY_CODE => save_type |= SaveType::CREDIT_CARD,
                EMAIL_ADDRESS => save_type |= SaveType::EMAIL_ADDRESS,
                PHONE | NAME => save_type |= SaveType::GENERIC,
                PASSWORD => {
                    save_type |= SaveType::PASSWORD;
                    save_type.remove(SaveType::EMAIL_ADDRESS);
                    save_type.remove(SaveType::USERNAME);
                }
                POSTAL_ADDRESS | POSTAL_CODE => save_type |= SaveType::ADDRESS,
                USERNAME => save_type |= SaveType::USERNAME,
                _ => {}
            }
        }
        save_type
    }
}

impl BitOr for SaveType {
    type Output = SaveType;

    fn bitor(self, rhs: SaveType) -> SaveType {
        SaveType(self.0 | rhs.0)
    }
}

impl BitOrAssign for SaveType {
    fn bitor_assign(&mut self, rhs: SaveType) {
        self.0 |= rhs.0;
    }
}
