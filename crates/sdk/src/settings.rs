//! Repository-level settings reported by the engine
//!
//! Settings come back by value, so decoding is a plain field copy with the
//! wire booleans widened to `bool`.

use serde::{Deserialize, Serialize};
use topt_ffi as ffi;
use topt_ffi::{as_bool, from_bool};

/// Early-flake-detection retry counts keyed by test duration bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EfdSlowTestRetriesSettings {
    /// Retries for tests faster than 5 seconds
    pub five_s: i32,
    /// Retries for tests faster than 10 seconds
    pub ten_s: i32,
    /// Retries for tests faster than 30 seconds
    pub thirty_s: i32,
    /// Retries for tests faster than 5 minutes
    pub five_m: i32,
}

/// Early-flake-detection settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EfdSettings {
    pub enabled: bool,
    pub slow_test_retries: EfdSlowTestRetriesSettings,
    /// Percentage of new tests above which the session is considered faulty
    pub faulty_session_threshold: i32,
}

/// Test-management settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestManagementSettings {
    pub enabled: bool,
    pub attempt_to_fix_retries: i32,
}

/// Settings for the current repository and configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub code_coverage: bool,
    pub early_flake_detection: EfdSettings,
    pub flaky_test_retries_enabled: bool,
    pub itr_enabled: bool,
    pub require_git: bool,
    pub tests_skipping: bool,
    pub known_tests_enabled: bool,
    pub test_management: TestManagementSettings,
}

impl Settings {
    /// Decode the engine's settings record.
    pub fn from_wire(raw: &ffi::SettingsResponse) -> Self {
        let efd = &raw.early_flake_detection;
        let slow = &efd.slow_test_retries;
        Settings {
            code_coverage: as_bool(raw.code_coverage),
            early_flake_detection: EfdSettings {
                enabled: as_bool(efd.enabled),
                slow_test_retries: EfdSlowTestRetriesSettings {
                    five_s: slow.five_s,
                    ten_s: slow.ten_s,
                    thirty_s: slow.thirty_s,
                    five_m: slow.five_m,
                },
                faulty_session_threshold: efd.faulty_session_threshold,
            },
            flaky_test_retries_enabled: as_bool(raw.flaky_test_retries_enabled),
            itr_enabled: as_bool(raw.itr_enabled),
            require_git: as_bool(raw.require_git),
            tests_skipping: as_bool(raw.tests_skipping),
            known_tests_enabled: as_bool(raw.known_tests_enabled),
            test_management: TestManagementSettings {
                enabled: as_bool(raw.test_management.enabled),
                attempt_to_fix_retries: raw.test_management.attempt_to_fix_retries,
            },
        }
    }

    /// Encode as the engine's settings record.
    pub fn to_wire(&self) -> ffi::SettingsResponse {
        let efd = &self.early_flake_detection;
        ffi::SettingsResponse {
            code_coverage: from_bool(self.code_coverage),
            early_flake_detection: ffi::SettingsEarlyFlakeDetection {
                enabled: from_bool(efd.enabled),
                slow_test_retries: ffi::SettingsEarlyFlakeDetectionSlowRetries {
                    ten_s: efd.slow_test_retries.ten_s,
                    thirty_s: efd.slow_test_retries.thirty_s,
                    five_m: efd.slow_test_retries.five_m,
                    five_s: efd.slow_test_retries.five_s,
                },
                faulty_session_threshold: efd.faulty_session_threshold,
            },
            flaky_test_retries_enabled: from_bool(self.flaky_test_retries_enabled),
            itr_enabled: from_bool(self.itr_enabled),
            require_git: from_bool(self.require_git),
            tests_skipping: from_bool(self.tests_skipping),
            known_tests_enabled: from_bool(self.known_tests_enabled),
            test_management: ffi::SettingsTestManagement {
                enabled: from_bool(self.test_management.enabled),
                attempt_to_fix_retries: self.test_management.attempt_to_fix_retries,
            },
            ..ffi::SettingsResponse::default()
        }
    }
}

/// Flaky-test auto-retry budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlakyTestRetriesSettings {
    /// Retries allowed per failing test
    pub retry_count: i32,
    /// Retries allowed across the whole session
    pub total_retry_count: i32,
}

impl FlakyTestRetriesSettings {
    pub fn from_wire(raw: &ffi::FlakyTestRetriesSettings) -> Self {
        FlakyTestRetriesSettings {
            retry_count: raw.retry_count,
            total_retry_count: raw.total_retry_count,
        }
    }

    pub fn to_wire(&self) -> ffi::FlakyTestRetriesSettings {
        ffi::FlakyTestRetriesSettings {
            retry_count: self.retry_count,
            total_retry_count: self.total_retry_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_wire_settings_decode_as_disabled() {
        let settings = Settings::from_wire(&ffi::SettingsResponse::default());
        assert_eq!(settings, Settings::default());
        assert!(!settings.code_coverage);
        assert!(!settings.test_management.enabled);
    }

    #[test]
    fn test_nonzero_wire_bool_is_true() {
        let raw = ffi::SettingsResponse {
            itr_enabled: 9,
            tests_skipping: 1,
            ..ffi::SettingsResponse::default()
        };
        let settings = Settings::from_wire(&raw);
        assert!(settings.itr_enabled);
        assert!(settings.tests_skipping);
        assert!(!settings.require_git);
    }

    #[test]
    fn test_slow_retry_buckets_keep_their_names() {
        let mut raw = ffi::SettingsResponse::default();
        raw.early_flake_detection.enabled = 1;
        raw.early_flake_detection.slow_test_retries = ffi::SettingsEarlyFlakeDetectionSlowRetries {
            ten_s: 5,
            thirty_s: 3,
            five_m: 2,
            five_s: 10,
        };
        raw.early_flake_detection.faulty_session_threshold = 30;

        let efd = Settings::from_wire(&raw).early_flake_detection;
        assert!(efd.enabled);
        assert_eq!(efd.slow_test_retries.five_s, 10);
        assert_eq!(efd.slow_test_retries.ten_s, 5);
        assert_eq!(efd.slow_test_retries.thirty_s, 3);
        assert_eq!(efd.slow_test_retries.five_m, 2);
        assert_eq!(efd.faulty_session_threshold, 30);
    }

    #[test]
    fn test_settings_serialize_to_json() {
        let settings = Settings {
            known_tests_enabled: true,
            ..Settings::default()
        };
        let json = serde_json::to_value(settings).unwrap();
        assert_eq!(json["known_tests_enabled"], true);
        assert_eq!(json["early_flake_detection"]["slow_test_retries"]["five_s"], 0);
    }

    #[test]
    fn test_flaky_retries_from_wire() {
        let raw = ffi::FlakyTestRetriesSettings {
            retry_count: 5,
            total_retry_count: 1000,
        };
        let decoded = FlakyTestRetriesSettings::from_wire(&raw);
        assert_eq!(decoded.retry_count, 5);
        assert_eq!(decoded.total_retry_count, 1000);
        assert_eq!(decoded.to_wire(), raw);
    }
}
