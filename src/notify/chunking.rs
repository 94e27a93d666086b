//! Splitting of long notification messages.

use crate::error::NotifyError;

/// Maximum characters per chat message part, label included.
pub const DISCORD_MESSAGE_LIMIT: usize = 1900;

fn label(part: usize, total: usize) -> String {
    format!("(Part {}/{})\n", part, total)
}

/// Splits `content` into ordered parts of at most `limit` characters.
///
/// A message that fits is returned as a single unlabelled part. Longer ones
/// are cut on character boundaries and each part is prefixed with
/// `(Part i/N)`, the prefix counting towards the limit.
///
/// # Errors
///
/// `NotifyError::LimitTooSmall` if a part cannot hold its label and at least
/// one character.
pub fn chunk_message(content: &str, limit: usize) -> Result<Vec<String>, NotifyError> {
    let chars: Vec<char> = content.chars().collect();
    if chars.len() <= limit {
        return Ok(vec![content.to_string()]);
    }

    // Wider part counts shrink the room per part; settle on a stable count.
    let mut total = chars.len().div_ceil(limit);
    let per_part = loop {
        let label_len = label(total, total).chars().count();
        if limit <= label_len {
            return Err(NotifyError::LimitTooSmall(limit));
        }
        let per_part = limit - label_len;
        let needed = chars.len().div_ceil(per_part);
        if needed <= total {
            break per_part;
        }
        total = needed;
    };

    let pieces: Vec<String> = chars
        .chunks(per_part)
        .map(|piece| piece.iter().collect())
        .collect();
    let total = pieces.len();

    Ok(pieces
        .into_iter()
        .enumerate()
        .map(|(i, piece)| format!("{}{}", label(i + 1, total), piece))
        .collect())
}
