//! Integration tests for the availability manager: window validation,
//! the per-dentist non-overlap invariant, and soft deletion.

mod common;

use common::*;

use clinic_scheduling_core::domain::{AvailabilityKind, NewAvailability};
use clinic_scheduling_core::ScheduleError;
use uuid::Uuid;

fn window(
    dentist_id: Uuid,
    kind: AvailabilityKind,
    start: (u32, u32),
    end: (u32, u32),
    reason: Option<&str>,
) -> NewAvailability {
    NewAvailability {
        dentist_id,
        date: d(2025, 6, 10),
        start_time: t(start.0, start.1),
        end_time: t(end.0, end.1),
        kind,
        reason: reason.map(str::to_string),
        created_by: Uuid::new_v4(),
    }
}

#[tokio::test]
async fn windows_shorter_than_the_minimum_are_rejected() {
    let fx = fixture();
    let dentist = Uuid::new_v4();

    let err = fx
        .availability
        .create_availability(window(dentist, AvailabilityKind::Working, (9, 0), (9, 45), None))
        .await
        .unwrap_err();
    assert!(matches!(err, ScheduleError::Validation(_)));

    // Exactly sixty minutes passes.
    fx.availability
        .create_availability(window(dentist, AvailabilityKind::Working, (9, 0), (10, 0), None))
        .await
        .expect("a one-hour window is the allowed minimum");
}

#[tokio::test]
async fn inverted_window_is_rejected() {
    let fx = fixture();
    let err = fx
        .availability
        .create_availability(window(
            Uuid::new_v4(),
            AvailabilityKind::Working,
            (12, 0),
            (8, 0),
            None,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, ScheduleError::Validation(_)));
}

#[tokio::test]
async fn non_working_window_requires_a_reason() {
    let fx = fixture();
    let dentist = Uuid::new_v4();

    let err = fx
        .availability
        .create_availability(window(dentist, AvailabilityKind::NonWorking, (8, 0), (12, 0), None))
        .await
        .unwrap_err();
    assert!(matches!(err, ScheduleError::Validation(_)));

    let err = fx
        .availability
        .create_availability(window(
            dentist,
            AvailabilityKind::NonWorking,
            (8, 0),
            (12, 0),
            Some("   "),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, ScheduleError::Validation(_)));

    fx.availability
        .create_availability(window(
            dentist,
            AvailabilityKind::NonWorking,
            (8, 0),
            (12, 0),
            Some("dental conference"),
        ))
        .await
        .expect("a non-working window with a reason should be accepted");
}

#[tokio::test]
async fn working_window_takes_no_reason() {
    let fx = fixture();
    let err = fx
        .availability
        .create_availability(window(
            Uuid::new_v4(),
            AvailabilityKind::Working,
            (8, 0),
            (12, 0),
            Some("unexpected"),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, ScheduleError::Validation(_)));
}

#[tokio::test]
async fn overlapping_windows_for_one_dentist_are_rejected() {
    let fx = fixture();
    let dentist = Uuid::new_v4();

    let existing = fx
        .availability
        .create_availability(window(dentist, AvailabilityKind::Working, (8, 0), (12, 0), None))
        .await
        .unwrap();

    let err = fx
        .availability
        .create_availability(window(dentist, AvailabilityKind::Working, (11, 0), (14, 0), None))
        .await
        .unwrap_err();
    match err {
        ScheduleError::AvailabilityOverlap { other_id } => assert_eq!(other_id, existing.id),
        other => panic!("expected availability overlap, got {:?}", other),
    }

    // Another dentist is unaffected.
    fx.availability
        .create_availability(window(
            Uuid::new_v4(),
            AvailabilityKind::Working,
            (11, 0),
            (14, 0),
            None,
        ))
        .await
        .expect("windows of different dentists are independent");
}

#[tokio::test]
async fn touching_windows_do_not_overlap() {
    let fx = fixture();
    let dentist = Uuid::new_v4();

    fx.availability
        .create_availability(window(dentist, AvailabilityKind::Working, (8, 0), (12, 0), None))
        .await
        .unwrap();
    fx.availability
        .create_availability(window(dentist, AvailabilityKind::Working, (12, 0), (16, 0), None))
        .await
        .expect("a window starting where another ends is legal");
}

#[tokio::test]
async fn working_windows_listing_is_sorted_and_filtered() {
    let fx = fixture();
    let dentist = Uuid::new_v4();

    fx.availability
        .create_availability(window(dentist, AvailabilityKind::Working, (14, 0), (18, 0), None))
        .await
        .unwrap();
    fx.availability
        .create_availability(window(dentist, AvailabilityKind::Working, (8, 0), (12, 0), None))
        .await
        .unwrap();
    fx.availability
        .create_availability(window(
            dentist,
            AvailabilityKind::NonWorking,
            (12, 0),
            (14, 0),
            Some("lunch"),
        ))
        .await
        .unwrap();

    let windows = fx
        .availability
        .list_working_windows(dentist, d(2025, 6, 10))
        .await
        .unwrap();
    assert_eq!(windows, vec![(t(8, 0), t(12, 0)), (t(14, 0), t(18, 0))]);
}

#[tokio::test]
async fn overlap_probe_honors_the_exclusion() {
    let fx = fixture();
    let dentist = Uuid::new_v4();
    let existing = fx
        .availability
        .create_availability(window(dentist, AvailabilityKind::Working, (8, 0), (12, 0), None))
        .await
        .unwrap();

    assert!(fx
        .availability
        .windows_overlap(dentist, d(2025, 6, 10), t(9, 0), t(10, 0), None)
        .await
        .unwrap());
    assert!(!fx
        .availability
        .windows_overlap(dentist, d(2025, 6, 10), t(9, 0), t(10, 0), Some(existing.id))
        .await
        .unwrap());
}

#[tokio::test]
async fn deleting_a_window_with_a_pending_appointment_is_blocked() {
    let fx = fixture();
    let dentist = Uuid::new_v4();
    let window_row = working_window(&fx, dentist, d(2025, 6, 10), t(8, 0), t(12, 0)).await;

    let appointment = fx
        .engine
        .create_appointment(booking(dentist, Uuid::new_v4(), dt(2025, 6, 10, 9, 0), 30))
        .await
        .unwrap();

    let err = fx
        .availability
        .delete_availability(window_row.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ScheduleError::Validation(_)));

    // Once the appointment is cancelled, deletion goes through and the
    // window stops serving containment.
    fx.engine.cancel_appointment(appointment.id, None).await.unwrap();
    fx.availability.delete_availability(window_row.id).await.unwrap();

    let err = fx
        .engine
        .create_appointment(booking(dentist, Uuid::new_v4(), dt(2025, 6, 10, 9, 0), 30))
        .await
        .unwrap_err();
    assert!(matches!(err, ScheduleError::OutsideWorkingHours { .. }));
}

#[tokio::test]
async fn deleting_an_unknown_or_deleted_window_is_not_found() {
    let fx = fixture();
    let dentist = Uuid::new_v4();

    let err = fx
        .availability
        .delete_availability(Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, ScheduleError::NotFound(_)));

    let window_row = working_window(&fx, dentist, d(2025, 6, 10), t(8, 0), t(12, 0)).await;
    fx.availability.delete_availability(window_row.id).await.unwrap();
    let err = fx
        .availability
        .delete_availability(window_row.id)
        .await
        .unwrap_err();
    assert!(matches!(err, ScheduleError::NotFound(_)));
}

#[tokio::test]
async fn deleted_windows_remain_visible_to_admin_listing() {
    let fx = fixture();
    let dentist = Uuid::new_v4();
    let window_row = working_window(&fx, dentist, d(2025, 6, 10), t(8, 0), t(12, 0)).await;
    fx.availability.delete_availability(window_row.id).await.unwrap();

    let visible = fx
        .availability
        .list_for_day(dentist, d(2025, 6, 10), false)
        .await
        .unwrap();
    assert!(visible.is_empty());

    let all = fx
        .availability
        .list_for_day(dentist, d(2025, 6, 10), true)
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].is_deleted());

    // The tombstoned slot can be re-declared.
    working_window(&fx, dentist, d(2025, 6, 10), t(8, 0), t(12, 0)).await;
}
