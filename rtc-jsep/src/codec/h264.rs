//! H.264 `profile-level-id` arithmetic (RFC 6184 section 8.1).
//!
//! A profile-level-id is three bytes: `profile_idc`, the constraint flags
//! and `level_idc`. Levels are compared on a total order in which level 1b
//! sits between 1.0 and 1.1. Level 1b is written either as `level_idc = 9`
//! or, for the Baseline, Main and Extended profiles, as `level_idc = 11`
//! with `constraint_set3_flag` set.

use std::cmp::Ordering;

/// Constrained Baseline, level 3.1.
pub const DEFAULT_PROFILE_LEVEL_ID: u32 = 0x42e01f;

const PROFILE_IDC_BASELINE: u32 = 0x42;
const PROFILE_IDC_MAIN: u32 = 0x4d;
const PROFILE_IDC_EXTENDED: u32 = 0x58;

const CONSTRAINT_SET3_FLAG: u32 = 0x1000;
const LEVEL_IDC_MASK: u32 = 0xff;
const LEVEL_1B_ORDER: u32 = 105;

/// parse_profile_level_id decodes the six hex digits of a profile-level-id.
pub fn parse_profile_level_id(s: &str) -> Option<u32> {
    let bytes = hex::decode(s.trim()).ok()?;
    if bytes.len() != 3 {
        return None;
    }
    Some((bytes[0] as u32) << 16 | (bytes[1] as u32) << 8 | bytes[2] as u32)
}

pub fn format_profile_level_id(profile_level_id: u32) -> String {
    format!("{:06x}", profile_level_id & 0xffffff)
}

pub fn profile_idc(profile_level_id: u32) -> u32 {
    (profile_level_id >> 16) & 0xff
}

pub fn level_idc(profile_level_id: u32) -> u32 {
    profile_level_id & LEVEL_IDC_MASK
}

fn uses_constraint_set3_for_1b(profile_level_id: u32) -> bool {
    matches!(
        profile_idc(profile_level_id),
        PROFILE_IDC_BASELINE | PROFILE_IDC_MAIN | PROFILE_IDC_EXTENDED
    )
}

pub fn is_level_1b(profile_level_id: u32) -> bool {
    let level = level_idc(profile_level_id);
    level == 9
        || (level == 11
            && uses_constraint_set3_for_1b(profile_level_id)
            && profile_level_id & CONSTRAINT_SET3_FLAG != 0)
}

/// level_order maps a level onto a comparable integer: ten times the
/// level number, with 1b at 105.
pub fn level_order(profile_level_id: u32) -> u32 {
    if is_level_1b(profile_level_id) {
        LEVEL_1B_ORDER
    } else {
        level_idc(profile_level_id) * 10
    }
}

pub fn compare_levels(a: u32, b: u32) -> Ordering {
    level_order(a).cmp(&level_order(b))
}

/// with_level_of returns `profile_level_id` carrying the level of `other`.
pub fn with_level_of(profile_level_id: u32, other: u32) -> u32 {
    let base = profile_level_id & !(LEVEL_IDC_MASK | CONSTRAINT_SET3_FLAG);
    let keep_set3 = profile_level_id & CONSTRAINT_SET3_FLAG;

    if is_level_1b(other) {
        if uses_constraint_set3_for_1b(profile_level_id) {
            base | CONSTRAINT_SET3_FLAG | 11
        } else {
            base | keep_set3 | 9
        }
    } else if uses_constraint_set3_for_1b(profile_level_id) {
        // constraint_set3 together with level 1.1 would read as 1b
        base | level_idc(other)
    } else {
        base | keep_set3 | level_idc(other)
    }
}

/// min_level returns `local` lowered to the smaller of the two levels.
pub fn min_level(local: u32, remote: u32) -> u32 {
    if compare_levels(remote, local) == Ordering::Less {
        with_level_of(local, remote)
    } else {
        local
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_profile_level_id() {
        let tests = vec![
            ("42e01f", Some(0x42e01f)),
            ("42E01F", Some(0x42e01f)),
            ("640c1f", Some(0x640c1f)),
            ("42e0", None),
            ("42e01f00", None),
            ("zzzzzz", None),
            ("", None),
        ];

        for (input, expected) in tests {
            assert_eq!(parse_profile_level_id(input), expected, "{input}");
        }
        assert_eq!(format_profile_level_id(0x42e01f), "42e01f");
    }

    #[test]
    fn test_level_order() {
        let tests = vec![
            ("level 1.0", 0x42e00a, 100),
            ("level 1b baseline", 0x42f00b, 105),
            ("level 1b high", 0x640009, 105),
            ("level 1.1 baseline", 0x42e00b, 110),
            ("level 1.1 high with set3", 0x64100b, 110),
            ("level 3.1", 0x42e01f, 310),
        ];

        for (name, plid, expected) in tests {
            assert_eq!(level_order(plid), expected, "{name}");
        }
    }

    #[test]
    fn test_level_1b_between_1_0_and_1_1() {
        let l10 = 0x42e00a;
        let l1b = 0x42f00b;
        let l11 = 0x42e00b;

        assert_eq!(compare_levels(l10, l1b), Ordering::Less);
        assert_eq!(compare_levels(l1b, l11), Ordering::Less);
        assert_eq!(compare_levels(l11, l1b), Ordering::Greater);
    }

    #[test]
    fn test_min_level() {
        let tests = vec![
            ("remote lower", 0x42e01f, 0x42e00d, 0x42e00d),
            ("remote higher", 0x42e00d, 0x42e01f, 0x42e00d),
            ("remote 1b keeps baseline set3", 0x42e01f, 0x42f00b, 0x42f00b),
            ("remote 1b onto high profile", 0x64001f, 0x42f00b, 0x640009),
            ("local 1b remote 1.1", 0x42f00b, 0x42e00b, 0x42f00b),
        ];

        for (name, local, remote, expected) in tests {
            assert_eq!(
                min_level(local, remote),
                expected,
                "{name}: got {:06x}",
                min_level(local, remote)
            );
        }
    }
}
