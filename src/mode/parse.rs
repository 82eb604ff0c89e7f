//! IRC mode parsing.

use super::{ModeChange, Sign};

enum PlusMinus {
    Plus,
    Minus,
}

/// Parse user mode strings like `+iw-x`. User modes never take arguments.
pub fn parse_user_modes(modes: &str) -> Vec<ModeChange> {
    parse_modes(&[modes], |_, _| false)
}

/// Parse a mode string and its arguments, e.g. `["+ov-b", "mk", "jo", "*!*@x"]`.
///
/// `takes_arg` decides, per mode character and sign, whether the mode
/// consumes the next argument. A missing argument yields `None`; surplus
/// arguments are ignored, since the server is the authority on what it sent.
pub fn parse_modes<F>(pieces: &[&str], takes_arg: F) -> Vec<ModeChange>
where
    F: Fn(char, Sign) -> bool,
{
    use self::PlusMinus::*;

    let mut res = vec![];

    if let Some((first, rest)) = pieces.split_first() {
        let mut args = rest.iter().copied();
        let mut cur_mod = Plus;

        for c in first.chars() {
            match c {
                '+' => cur_mod = Plus,
                '-' => cur_mod = Minus,
                _ => {
                    let sign = match cur_mod {
                        Plus => Sign::Plus,
                        Minus => Sign::Minus,
                    };
                    let arg = if takes_arg(c, sign) {
                        args.next().map(str::to_owned)
                    } else {
                        None
                    };
                    res.push(ModeChange { sign, mode: c, arg });
                }
            }
        }
    }

    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel_rules(c: char, sign: Sign) -> bool {
        match c {
            'o' | 'v' | 'b' | 'k' => true,
            'l' => sign == Sign::Plus,
            _ => false,
        }
    }

    #[test]
    fn test_user_modes_toggle() {
        let modes = parse_user_modes("+iw-x");
        assert_eq!(modes.len(), 3);
        assert_eq!(modes[0], ModeChange::plus('i'));
        assert_eq!(modes[1], ModeChange::plus('w'));
        assert_eq!(modes[2], ModeChange::minus('x'));
    }

    #[test]
    fn test_no_prefix_means_plus() {
        let modes = parse_user_modes("i");
        assert_eq!(modes, [ModeChange::plus('i')]);
    }

    #[test]
    fn test_channel_modes_with_args() {
        let modes = parse_modes(&["+ov-b+l", "mk", "jo", "*!*@x", "10"], channel_rules);
        assert_eq!(modes.len(), 4);
        assert_eq!(modes[0].arg.as_deref(), Some("mk"));
        assert_eq!(modes[1].arg.as_deref(), Some("jo"));
        assert_eq!(modes[2].sign, Sign::Minus);
        assert_eq!(modes[2].arg.as_deref(), Some("*!*@x"));
        assert_eq!(modes[3].arg.as_deref(), Some("10"));
    }

    #[test]
    fn test_limit_removal_takes_no_arg() {
        let modes = parse_modes(&["-l+k", "secret"], channel_rules);
        assert_eq!(modes[0], ModeChange::minus('l'));
        assert_eq!(modes[1].arg.as_deref(), Some("secret"));
    }

    #[test]
    fn test_ban_list_query_no_arg() {
        let modes = parse_modes(&["+b"], channel_rules);
        assert_eq!(modes, [ModeChange::plus('b')]);
    }

    #[test]
    fn test_empty() {
        assert!(parse_modes(&[], channel_rules).is_empty());
        assert!(parse_user_modes("").is_empty());
    }
}
