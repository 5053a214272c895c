// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Memory model error types

use thiserror::Error;

/// Result type for memory model operations
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Errors raised at the boundaries of the memory model.
///
/// None of these are fatal to an analysis run. They surface when a caller
/// reads or decodes a dialogue document or parses an enumerant from untrusted text.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// Unrecognized memory category tag
    #[error("Unknown memory category: {0}")]
    UnknownCategory(String),

    /// Unrecognized hallucination type tag
    #[error("Unknown hallucination type: {0}")]
    UnknownHallucinationType(String),

    /// Dialogue document could not be decoded
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Dialogue document could not be read
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<serde_json::Error> for MemoryError {
    fn from(e: serde_json::Error) -> Self {
        MemoryError::SerializationError(e.to_string())
    }
}
