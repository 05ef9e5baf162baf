//! Test utilities & fixtures shared by the realm integration tests.

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use realmkeep::realm::{
    ActionCatalog, GameRules, RealmService, RealmStoreBuilder, SeasonTable, StartingKit,
};

/// Fixed instant all tests measure from; noon so day boundaries are far away.
#[allow(dead_code)]
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

/// Realm with the built-in catalog and a calendar created at [`epoch`].
#[allow(dead_code)]
pub fn open_realm(dir: &TempDir) -> RealmService {
    open_realm_with(dir, ActionCatalog::builtin())
}

#[allow(dead_code)]
pub fn open_realm_with(dir: &TempDir, catalog: ActionCatalog) -> RealmService {
    let store = RealmStoreBuilder::new(dir.path())
        .with_calendar_start(epoch())
        .open()
        .expect("store");
    RealmService::new(
        store,
        GameRules::default(),
        SeasonTable::default(),
        catalog,
        StartingKit::default(),
    )
}

/// Advance the world calendar one real day at a time until it reads `day`.
#[allow(dead_code)]
pub fn advance_to_day(realm: &RealmService, day: u32) {
    let mut current = realm.calendar().expect("calendar").absolute_day;
    while current < day {
        let now = epoch() + chrono::Duration::days(current as i64);
        let (snapshot, advanced) = realm.advance_calendar(now).expect("advance");
        assert!(advanced, "day {} should advance", current);
        current = snapshot.absolute_day;
    }
}
