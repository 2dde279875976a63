// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Grid configuration
//!

use crate::Error;

use serde::Deserialize;

/// Size of the simulated domain, in cells, and of the square patch each actor owns.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct GridConfig {
    pub x_size: usize,
    pub y_size: usize,
    pub patch_size: usize,
}

impl GridConfig {
    pub fn new(x_size: usize, y_size: usize, patch_size: usize) -> Self {
        Self {
            x_size,
            y_size,
            patch_size,
        }
    }

    /// Checks that the domain splits into a whole, non-empty number of patches.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfig`] naming the first violated constraint.
    pub fn validate(&self) -> Result<(), Error> {
        if self.patch_size == 0 {
            return Err(Error::InvalidConfig(
                "patch size must be positive".to_owned(),
            ));
        }
        if self.x_size % self.patch_size != 0 || self.y_size % self.patch_size != 0 {
            return Err(Error::InvalidConfig(format!(
                "domain {}x{} is not a multiple of patch size {}",
                self.x_size, self.y_size, self.patch_size
            )));
        }
        if self.x_size == 0 || self.y_size == 0 {
            return Err(Error::InvalidConfig("domain is empty".to_owned()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_validate() {
        assert!(GridConfig::new(64, 32, 16).validate().is_ok());
        assert!(matches!(
            GridConfig::new(64, 32, 0).validate(),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            GridConfig::new(64, 30, 16).validate(),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(
            GridConfig::new(0, 32, 16).validate(),
            Err(Error::InvalidConfig(_))
        ));
    }
}
