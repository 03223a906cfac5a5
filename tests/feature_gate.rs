use svgthumb::feature_gate::{
    disable_all, disable_all_on_process, FeatureControl, FeatureEntry, FeatureScope, FeatureTable, PlatformStatus,
};
use svgthumb::Error;

/// Records every call and fails on one chosen entry.
#[derive(Default)]
struct Recorder {
    calls: Vec<(FeatureEntry, FeatureScope, bool)>,
    fail_on: Option<FeatureEntry>,
}

impl FeatureControl for Recorder {
    fn set_feature_enabled(&mut self, entry: FeatureEntry, scope: FeatureScope, enabled: bool) -> PlatformStatus {
        self.calls.push((entry, scope, enabled));
        if self.fail_on == Some(entry) {
            PlatformStatus(0x8007_0057_u32 as i32)
        } else {
            PlatformStatus::OK
        }
    }

    fn is_feature_enabled(&self, _entry: FeatureEntry, _scope: FeatureScope) -> PlatformStatus {
        PlatformStatus::OK
    }
}

#[test]
fn every_entry_is_disabled_in_index_order() {
    let mut r = Recorder::default();
    disable_all(&mut r, FeatureScope::Process).unwrap();
    assert_eq!(r.calls.len(), FeatureEntry::COUNT);
    for (i, (entry, scope, enabled)) in r.calls.iter().enumerate() {
        assert_eq!(entry.index(), i);
        assert_eq!(*scope, FeatureScope::Process);
        assert!(!enabled);
    }
}

#[test]
fn first_failure_aborts_with_status() {
    let mut r = Recorder {
        fail_on: Some(FeatureEntry::SecurityBand),
        ..Default::default()
    };
    match disable_all(&mut r, FeatureScope::Thread) {
        Err(Error::PlatformFeatureError { entry, code }) => {
            assert_eq!(entry, FeatureEntry::SecurityBand);
            assert_eq!(code, 0x8007_0057_u32 as i32);
        }
        other => panic!("unexpected: {:?}", other),
    }
    // Nothing after the failing entry was touched
    assert_eq!(r.calls.len(), FeatureEntry::SecurityBand.index() + 1);
}

#[test]
fn disabling_twice_is_idempotent() {
    let mut table = FeatureTable::new();
    disable_all_on_process(&mut table).unwrap();
    let once = table.disabled(FeatureScope::Process);
    disable_all_on_process(&mut table).unwrap();
    assert_eq!(table.disabled(FeatureScope::Process), once);
    assert_eq!(once, FeatureEntry::ALL.to_vec());
}

#[test]
fn error_message_names_entry_and_status() {
    let err = Error::PlatformFeatureError {
        entry: FeatureEntry::MimeSniffing,
        code: -2147024809,
    };
    let msg = err.to_string();
    assert!(msg.contains("MimeSniffing"));
    assert!(msg.contains("0x80070057"));
}
