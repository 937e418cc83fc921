//! Random password generation from weighted character classes.

use kadm_config::PasswordSettings;
use rand::seq::SliceRandom;
use rand::Rng;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::secret::Secret;

/// `frequency` characters of a generated password are drawn from `charset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharacterClass {
    charset: Vec<u8>,
    frequency: u32,
}

impl CharacterClass {
    /// Fails with a bad-class error when a class that contributes characters
    /// has nothing to draw from, or when the charset is not ASCII.
    pub fn new(charset: &str, frequency: u32) -> Result<Self> {
        if !charset.is_ascii() || (frequency > 0 && charset.is_empty()) {
            return Err(Error::bad_class());
        }
        Ok(Self {
            charset: charset.as_bytes().to_vec(),
            frequency,
        })
    }

    pub fn frequency(&self) -> u32 {
        self.frequency
    }
}

#[derive(Debug, Clone)]
pub struct PasswordGenerator {
    classes: Vec<CharacterClass>,
}

impl PasswordGenerator {
    pub fn new(classes: Vec<CharacterClass>) -> Result<Self> {
        if classes.is_empty() {
            return Err(Error::bad_class());
        }
        Ok(Self { classes })
    }

    pub fn from_settings(settings: &PasswordSettings) -> Result<Self> {
        let classes = settings
            .classes
            .iter()
            .map(|c| CharacterClass::new(&c.charset, c.frequency))
            .collect::<Result<Vec<_>>>()?;
        Self::new(classes)
    }

    /// Length of every generated password
    pub fn length(&self) -> usize {
        self.classes.iter().map(|c| c.frequency as usize).sum()
    }

    pub fn generate(&self) -> Secret {
        let mut rng = rand::rng();
        let mut chars = Zeroizing::new(Vec::with_capacity(self.length()));

        for class in &self.classes {
            for _ in 0..class.frequency {
                let i = rng.random_range(0..class.charset.len());
                chars.push(class.charset[i]);
            }
        }
        chars.shuffle(&mut rng);

        Secret::new(chars.as_slice())
    }
}

impl Default for PasswordGenerator {
    fn default() -> Self {
        let classes = PasswordSettings::default()
            .classes
            .into_iter()
            .map(|c| CharacterClass {
                charset: c.charset.into_bytes(),
                frequency: c.frequency,
            })
            .collect();
        Self { classes }
    }
}
