/// Integration tests for the shared world calendar and seasonal effects
use chrono::{Duration, TimeZone, Utc};
use std::sync::{Arc, Barrier};
use std::thread;
use tempfile::TempDir;

use realmkeep::realm::{
    ActionCatalog, ActionDefinition, ActionKind, RealmStoreBuilder, Season, SeasonTable,
};

mod common;
use common::{advance_to_day, epoch, open_realm, open_realm_with};

#[test]
fn new_world_starts_on_day_one() {
    let dir = TempDir::new().expect("tempdir");
    let realm = open_realm(&dir);
    let snapshot = realm.calendar().expect("calendar");
    assert_eq!(snapshot.absolute_day, 1);
    assert_eq!(snapshot.season, Season::Spring);
    assert_eq!(snapshot.year, 0);
}

#[test]
fn advance_is_idempotent_within_a_day() {
    let dir = TempDir::new().expect("tempdir");
    let realm = open_realm(&dir);

    // later the same UTC day
    let (_, advanced) = realm
        .advance_calendar(epoch() + Duration::hours(11))
        .expect("advance");
    assert!(!advanced);

    let tomorrow = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 5).unwrap();
    let (snapshot, advanced) = realm.advance_calendar(tomorrow).expect("advance");
    assert!(advanced);
    assert_eq!(snapshot.absolute_day, 2);
    assert_eq!(snapshot.day_of_week, 2);

    for offset in [1, 60, 3_600] {
        let (snapshot, advanced) = realm
            .advance_calendar(tomorrow + Duration::seconds(offset))
            .expect("advance");
        assert!(!advanced);
        assert_eq!(snapshot.absolute_day, 2);
    }
}

#[test]
fn missed_days_are_not_back_filled() {
    let dir = TempDir::new().expect("tempdir");
    let realm = open_realm(&dir);
    let (snapshot, advanced) = realm
        .advance_calendar(epoch() + Duration::days(5))
        .expect("advance");
    assert!(advanced);
    assert_eq!(snapshot.absolute_day, 2);
}

#[test]
fn concurrent_advances_count_once() {
    let dir = TempDir::new().expect("tempdir");
    let realm = open_realm(&dir);
    let tomorrow = epoch() + Duration::days(1);
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let realm = realm.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                realm.advance_calendar(tomorrow).expect("advance").1
            })
        })
        .collect();
    let advanced = handles
        .into_iter()
        .map(|h| h.join().expect("join"))
        .filter(|advanced| *advanced)
        .count();

    assert_eq!(advanced, 1);
    assert_eq!(realm.calendar().expect("calendar").absolute_day, 2);
}

#[test]
fn calendar_survives_reopen() {
    let dir = TempDir::new().expect("tempdir");
    {
        let realm = open_realm(&dir);
        advance_to_day(&realm, 4);
    }
    let store = RealmStoreBuilder::new(dir.path())
        .with_calendar_start(Utc::now())
        .open()
        .expect("reopen");
    assert_eq!(store.calendar_record().expect("calendar").absolute_day, 4);
}

#[test]
fn day_92_brings_summer_yields() {
    let dir = TempDir::new().expect("tempdir");
    let catalog = ActionCatalog::from_actions(vec![ActionDefinition::new(
        "harvest_barley",
        "Harvest barley",
        ActionKind::Gather,
        1,
    )
    .with_output("barley", 5, 5)])
    .expect("catalog");
    let realm = open_realm_with(&dir, catalog);
    advance_to_day(&realm, 92);

    let snapshot = realm.calendar().expect("calendar");
    assert_eq!(snapshot.season, Season::Summer);
    assert_eq!(snapshot.week_of_season, 1);
    assert_eq!(snapshot.day_of_week, 1);
    assert_eq!(snapshot.modifiers, SeasonTable::default().summer);

    let now = epoch() + Duration::days(92);
    realm.create_player("aldric", "Aldric", now).expect("create");
    let outcome = realm.perform("aldric", "harvest_barley", now).expect("harvest");
    assert_eq!(outcome.season, Season::Summer);
    // 5 * 1.2
    assert_eq!(outcome.items[0].delta, 6);
}

#[test]
fn winter_roads_are_slower() {
    let dir = TempDir::new().expect("tempdir");
    let realm = open_realm(&dir);
    advance_to_day(&realm, 274);
    assert_eq!(realm.calendar().expect("calendar").season, Season::Winter);

    let now = epoch() + Duration::days(274);
    realm.create_player("aldric", "Aldric", now).expect("create");
    let outcome = realm
        .perform("aldric", "travel_ashford_brightwater", now)
        .expect("travel");
    let trip = outcome.travel.expect("travel receipt");
    assert_eq!(trip.minutes, 90);
    assert_eq!(trip.arrives_at, now + Duration::minutes(90));
}
