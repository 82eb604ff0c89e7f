//! Mode deltas.
//!
//! `MODE` lines carry a sequence of `+`/`-` toggled mode characters.
//! [`parse_modes`] turns them into [`ModeChange`]s; [`merge_modes`] folds
//! changes into an accumulated mode string the way users and channels
//! keep them.

mod parse;

use std::fmt;

pub use self::parse::{parse_modes, parse_user_modes};

/// Whether a mode is being set or unset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Sign {
    /// `+`
    Plus,
    /// `-`
    Minus,
}

/// One mode character with its direction and argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModeChange {
    /// Set or unset.
    pub sign: Sign,
    /// Mode letter.
    pub mode: char,
    /// Argument consumed by this mode, if any.
    pub arg: Option<String>,
}

impl ModeChange {
    /// `+mode` without an argument.
    pub fn plus(mode: char) -> Self {
        ModeChange {
            sign: Sign::Plus,
            mode,
            arg: None,
        }
    }

    /// `-mode` without an argument.
    pub fn minus(mode: char) -> Self {
        ModeChange {
            sign: Sign::Minus,
            mode,
            arg: None,
        }
    }
}

impl fmt::Display for ModeChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = match self.sign {
            Sign::Plus => '+',
            Sign::Minus => '-',
        };
        write!(f, "{}{}", sign, self.mode)?;
        if let Some(ref arg) = self.arg {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Apply changes to an accumulated mode string. Added modes are appended
/// once; removed modes are dropped wherever they appear.
pub fn merge_modes<'a, I>(modes: &mut String, changes: I)
where
    I: IntoIterator<Item = &'a ModeChange>,
{
    for change in changes {
        match change.sign {
            Sign::Plus => {
                if !modes.contains(change.mode) {
                    modes.push(change.mode);
                }
            }
            Sign::Minus => modes.retain(|c| c != change.mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_modes() {
        let mut modes = String::from("nt");
        merge_modes(&mut modes, &parse_user_modes("+s-n+t"));
        assert_eq!(modes, "ts");
    }

    #[test]
    fn test_display() {
        let change = ModeChange {
            sign: Sign::Plus,
            mode: 'o',
            arg: Some("mk".into()),
        };
        assert_eq!(change.to_string(), "+o mk");
        assert_eq!(ModeChange::minus('i').to_string(), "-i");
    }
}
