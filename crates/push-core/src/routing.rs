use crate::{
    channels::{CRITICAL_CHANNEL_ID, NORMAL_CHANNEL_ID},
    types::{Importance, Route},
};

/// Priority at or above which a message is treated as critical.
pub const CRITICAL_PRIORITY: i32 = 8;
/// Lowest priority rendered with default importance.
pub const MEDIUM_PRIORITY: i32 = 5;
/// Lowest medium priority that still plays a sound.
pub const AUDIBLE_PRIORITY: i32 = 7;

/// Vibration pattern used for critical messages (off/on pairs, ms).
pub const CRITICAL_VIBRATION_PATTERN: [u64; 4] = [0, 250, 250, 250];

/// Map a message priority to its channel and presentation flags.
///
/// Only `critical` and `normal` are ever selected; the `default` channel is
/// a registry fallback for notifications raised outside this router.
pub fn route(priority: i32) -> Route {
    if priority >= CRITICAL_PRIORITY {
        Route {
            channel_id: CRITICAL_CHANNEL_ID,
            importance: Importance::High,
            sound_enabled: true,
            vibration_pattern: Some(CRITICAL_VIBRATION_PATTERN.to_vec()),
        }
    } else if priority >= MEDIUM_PRIORITY {
        Route {
            channel_id: NORMAL_CHANNEL_ID,
            importance: Importance::Default,
            sound_enabled: priority >= AUDIBLE_PRIORITY,
            vibration_pattern: None,
        }
    } else {
        Route {
            channel_id: NORMAL_CHANNEL_ID,
            importance: Importance::Low,
            sound_enabled: false,
            vibration_pattern: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_priority_goes_to_critical_with_vibration() {
        for priority in [8, 9, 10] {
            let route = route(priority);
            assert_eq!(route.channel_id, "critical");
            assert_eq!(route.importance, Importance::High);
            assert!(route.sound_enabled);
            assert!(route.vibration_pattern.is_some());
        }
    }

    #[test]
    fn medium_priority_is_silent_below_seven() {
        let route = route(6);
        assert_eq!(route.channel_id, "normal");
        assert_eq!(route.importance, Importance::Default);
        assert!(!route.sound_enabled);
        assert_eq!(route.vibration_pattern, None);
    }

    #[test]
    fn priority_seven_plays_sound_without_vibration() {
        let route = route(7);
        assert_eq!(route.channel_id, "normal");
        assert!(route.sound_enabled);
        assert_eq!(route.vibration_pattern, None);
    }

    #[test]
    fn low_priority_is_quiet() {
        for priority in [-1, 0, 2, 4] {
            let route = route(priority);
            assert_eq!(route.channel_id, "normal");
            assert_eq!(route.importance, Importance::Low);
            assert!(!route.sound_enabled);
            assert_eq!(route.vibration_pattern, None);
        }
    }

    #[test]
    fn never_selects_default_channel() {
        assert!((-5..=15).all(|priority| route(priority).channel_id != "default"));
    }
}
