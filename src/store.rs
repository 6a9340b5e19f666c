//! Canonical in-memory copies of the roster and attendance for one session.
//!
//! Every mutation is two-phase. `begin_*` applies the change locally, marks
//! the row `pending` and hands back a [`Ticket`] plus whatever must be sent to
//! the backend. Once the backend answers, the ticket goes to [`Workspace::commit`]
//! or [`Workspace::revert`]. A revert restores the previous value and flags
//! the row `failed` where the row still exists.
//!
//! One attendance record per (student, date) is kept by the `slots` index.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::marking::time_in_for;
use crate::model::{
    attendance::{AttendanceInsert, AttendanceRecord, AttendanceUpdate, Status},
    student::{NewStudent, Student, StudentUpdate},
};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Pending,
    Committed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct Tracked<T> {
    #[serde(flatten)]
    pub value: T,
    pub sync: SyncStatus,
}

impl<T> Tracked<T> {
    fn committed(value: T) -> Self {
        Self {
            value,
            sync: SyncStatus::Committed,
        }
    }

    fn pending(value: T) -> Self {
        Self {
            value,
            sync: SyncStatus::Pending,
        }
    }

    fn failed(value: T) -> Self {
        Self {
            value,
            sync: SyncStatus::Failed,
        }
    }
}

/// Uniqueness key of an attendance record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    pub student_id: Uuid,
    pub date: NaiveDate,
}

impl SlotKey {
    pub fn new(student_id: Uuid, date: NaiveDate) -> Self {
        Self { student_id, date }
    }

    fn of(record: &AttendanceRecord) -> Self {
        Self::new(record.student_id, record.date)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Student {0} not found")]
    StudentNotFound(Uuid),

    #[error("Attendance record {0} not found")]
    RecordNotFound(Uuid),

    #[error("A change to {0} is still being saved")]
    Busy(Uuid),

    #[error("Attendance for this student on {date} is still being saved")]
    SlotBusy { date: NaiveDate },
}

/// What a mark has to send to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordWrite {
    Insert(AttendanceInsert),
    Update { id: Uuid, update: AttendanceUpdate },
}

impl RecordWrite {
    pub fn is_insert(&self) -> bool {
        matches!(self, RecordWrite::Insert(_))
    }
}

/// Undo information for one in-flight mutation.
#[derive(Debug)]
#[must_use]
pub enum Ticket {
    AddStudent {
        provisional: Uuid,
    },
    UpdateStudent {
        previous: Student,
    },
    DeleteStudent {
        position: usize,
        student: Tracked<Student>,
        attendance: Vec<(usize, Tracked<AttendanceRecord>)>,
    },
    InsertRecord {
        provisional: Uuid,
        slot: SlotKey,
    },
    UpdateRecord {
        previous: AttendanceRecord,
    },
}

/// Backend's answer for a successful write.
#[derive(Debug)]
pub enum Confirmed {
    Student(Student),
    Record(AttendanceRecord),
    Deleted,
}

#[derive(Debug, Default)]
pub struct Workspace {
    students: Vec<Tracked<Student>>,
    attendance: Vec<Tracked<AttendanceRecord>>,
    slots: HashMap<SlotKey, Uuid>,
}

impl Workspace {
    /// Replaces everything with a fresh fetch. Both lists are newest first;
    /// if the backend holds two records for a slot the newest one is indexed.
    pub fn load(&mut self, students: Vec<Student>, attendance: Vec<AttendanceRecord>) {
        self.students = students.into_iter().map(Tracked::committed).collect();
        self.attendance = attendance.into_iter().map(Tracked::committed).collect();
        self.slots.clear();
        for record in &self.attendance {
            self.slots
                .entry(SlotKey::of(&record.value))
                .or_insert(record.value.id);
        }
    }

    pub fn students(&self) -> impl Iterator<Item = &Tracked<Student>> {
        self.students.iter()
    }

    pub fn attendance(&self) -> impl Iterator<Item = &Tracked<AttendanceRecord>> {
        self.attendance.iter()
    }

    pub fn student_values(&self) -> Vec<Student> {
        self.students.iter().map(|s| s.value.clone()).collect()
    }

    pub fn record_values(&self) -> Vec<AttendanceRecord> {
        self.attendance.iter().map(|r| r.value.clone()).collect()
    }

    pub fn student(&self, id: Uuid) -> Option<&Tracked<Student>> {
        self.students.iter().find(|s| s.value.id == id)
    }

    pub fn record(&self, id: Uuid) -> Option<&Tracked<AttendanceRecord>> {
        self.attendance.iter().find(|r| r.value.id == id)
    }

    pub fn record_for(&self, slot: SlotKey) -> Option<&Tracked<AttendanceRecord>> {
        self.slots.get(&slot).and_then(|id| self.record(*id))
    }

    fn student_pos(&self, id: Uuid) -> Option<usize> {
        self.students.iter().position(|s| s.value.id == id)
    }

    fn record_pos(&self, id: Uuid) -> Option<usize> {
        self.attendance.iter().position(|r| r.value.id == id)
    }

    pub fn begin_add_student(&mut self, owner: Uuid, draft: &NewStudent, now: DateTime<Utc>) -> Ticket {
        let provisional = Uuid::new_v4();
        let student = Student::from_draft(provisional, owner, draft, now);
        self.students.insert(0, Tracked::pending(student));
        Ticket::AddStudent { provisional }
    }

    pub fn begin_update_student(
        &mut self,
        id: Uuid,
        update: &StudentUpdate,
    ) -> Result<Ticket, StoreError> {
        let pos = self.student_pos(id).ok_or(StoreError::StudentNotFound(id))?;
        let entry = &mut self.students[pos];
        if entry.sync == SyncStatus::Pending {
            return Err(StoreError::Busy(id));
        }

        let previous = entry.value.clone();
        entry.value.apply(update);
        entry.sync = SyncStatus::Pending;
        Ok(Ticket::UpdateStudent { previous })
    }

    /// Removes the student and every local record referencing it. Refused
    /// while the student or any of its records is still being saved.
    pub fn begin_delete_student(&mut self, id: Uuid) -> Result<Ticket, StoreError> {
        let position = self.student_pos(id).ok_or(StoreError::StudentNotFound(id))?;
        let records_pending = self
            .attendance
            .iter()
            .any(|r| r.value.student_id == id && r.sync == SyncStatus::Pending);
        if self.students[position].sync == SyncStatus::Pending || records_pending {
            return Err(StoreError::Busy(id));
        }
        let student = self.students.remove(position);

        let mut attendance = Vec::new();
        let mut kept = Vec::with_capacity(self.attendance.len());
        for (index, record) in self.attendance.drain(..).enumerate() {
            if record.value.student_id == id {
                attendance.push((index, record));
            } else {
                kept.push(record);
            }
        }
        self.attendance = kept;
        self.slots.retain(|slot, _| slot.student_id != id);

        Ok(Ticket::DeleteStudent {
            position,
            student,
            attendance,
        })
    }

    /// Sets the status of a (student, date) slot, inserting the record when
    /// the slot is unmarked and updating it otherwise.
    pub fn begin_mark(
        &mut self,
        owner: Uuid,
        slot: SlotKey,
        status: Status,
        now: NaiveTime,
    ) -> Result<(Ticket, RecordWrite), StoreError> {
        let entry = self
            .student(slot.student_id)
            .ok_or(StoreError::StudentNotFound(slot.student_id))?;
        // a student still being added only has a local id
        if entry.sync == SyncStatus::Pending {
            return Err(StoreError::Busy(slot.student_id));
        }
        let student = entry.value.clone();
        let time_in = time_in_for(status, now);

        if let Some(&id) = self.slots.get(&slot) {
            if self.record(id).is_some_and(|r| r.sync == SyncStatus::Pending) {
                return Err(StoreError::SlotBusy { date: slot.date });
            }
            let update = AttendanceUpdate {
                status: Some(status),
                time_in: Some(time_in),
                ..Default::default()
            };
            let ticket = self.begin_update_record(id, &update)?;
            return Ok((ticket, RecordWrite::Update { id, update }));
        }

        let insert = AttendanceInsert {
            user_id: owner,
            student_id: slot.student_id,
            date: slot.date,
            time_in,
            status,
        };
        let provisional = Uuid::new_v4();
        let mut record = AttendanceRecord::from_insert(provisional, &insert, Utc::now());
        record.student = Some(student);

        self.attendance.insert(0, Tracked::pending(record));
        self.slots.insert(slot, provisional);
        Ok((Ticket::InsertRecord { provisional, slot }, RecordWrite::Insert(insert)))
    }

    pub fn begin_update_record(
        &mut self,
        id: Uuid,
        update: &AttendanceUpdate,
    ) -> Result<Ticket, StoreError> {
        let pos = self.record_pos(id).ok_or(StoreError::RecordNotFound(id))?;
        let entry = &mut self.attendance[pos];
        if entry.sync == SyncStatus::Pending {
            return Err(StoreError::Busy(id));
        }

        let previous = entry.value.clone();
        entry.value.apply(update);
        entry.sync = SyncStatus::Pending;
        Ok(Ticket::UpdateRecord { previous })
    }

    /// Merges the backend's row in place of the optimistic one.
    pub fn commit(&mut self, ticket: Ticket, confirmed: Confirmed) {
        match (ticket, confirmed) {
            (Ticket::AddStudent { provisional }, Confirmed::Student(student)) => {
                if let Some(pos) = self.student_pos(provisional) {
                    self.students[pos] = Tracked::committed(student);
                }
            }
            (Ticket::UpdateStudent { previous }, Confirmed::Student(student)) => {
                if let Some(pos) = self.student_pos(previous.id) {
                    self.refresh_embedded(&student);
                    self.students[pos] = Tracked::committed(student);
                }
            }
            (Ticket::DeleteStudent { .. }, Confirmed::Deleted) => {}
            (Ticket::InsertRecord { provisional, slot }, Confirmed::Record(record)) => {
                // the student may have been deleted while the insert was in flight
                if let Some(pos) = self.record_pos(provisional) {
                    self.slots.insert(slot, record.id);
                    self.attendance[pos] = Tracked::committed(self.keep_embedded(pos, record));
                }
            }
            (Ticket::UpdateRecord { previous }, Confirmed::Record(record)) => {
                if let Some(pos) = self.record_pos(previous.id) {
                    self.attendance[pos] = Tracked::committed(self.keep_embedded(pos, record));
                }
            }
            (ticket, confirmed) => {
                warn!(?ticket, ?confirmed, "Confirmation does not match ticket, ignored");
            }
        }
    }

    /// Undoes the optimistic change after the backend refused it.
    pub fn revert(&mut self, ticket: Ticket) {
        match ticket {
            Ticket::AddStudent { provisional } => {
                self.students.retain(|s| s.value.id != provisional);
            }
            Ticket::UpdateStudent { previous } => {
                if let Some(pos) = self.student_pos(previous.id) {
                    self.students[pos] = Tracked::failed(previous);
                }
            }
            Ticket::DeleteStudent {
                position,
                student,
                attendance,
            } => {
                let position = position.min(self.students.len());
                self.students
                    .insert(position, Tracked::failed(student.value));
                for (index, record) in attendance {
                    self.slots
                        .entry(SlotKey::of(&record.value))
                        .or_insert(record.value.id);
                    let index = index.min(self.attendance.len());
                    self.attendance.insert(index, record);
                }
            }
            Ticket::InsertRecord { provisional, slot } => {
                self.attendance.retain(|r| r.value.id != provisional);
                if self.slots.get(&slot) == Some(&provisional) {
                    self.slots.remove(&slot);
                }
            }
            Ticket::UpdateRecord { previous } => {
                if let Some(pos) = self.record_pos(previous.id) {
                    self.attendance[pos] = Tracked::failed(previous);
                }
            }
        }
    }

    fn keep_embedded(&self, pos: usize, mut record: AttendanceRecord) -> AttendanceRecord {
        if record.student.is_none() {
            record.student = self.attendance[pos].value.student.clone();
        }
        record
    }

    fn refresh_embedded(&mut self, student: &Student) {
        for record in &mut self.attendance {
            if record.value.student_id == student.id {
                record.value.student = Some(student.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::student::Year;

    fn draft(name: &str) -> NewStudent {
        NewStudent {
            name: name.into(),
            roll_number: format!("R-{name}"),
            department: "BCA".into(),
            email: format!("{name}@example.com"),
            phone: "9000000000".into(),
            year: Year::First,
        }
    }

    fn owner() -> Uuid {
        Uuid::from_u128(7)
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, 14).unwrap()
    }

    fn nine() -> NaiveTime {
        NaiveTime::from_hms_opt(9, 0, 12).unwrap()
    }

    /// Workspace with one committed student.
    fn seeded() -> (Workspace, Student) {
        let student = Student::from_draft(Uuid::new_v4(), owner(), &draft("asha"), Utc::now());
        let mut workspace = Workspace::default();
        workspace.load(vec![student.clone()], vec![]);
        (workspace, student)
    }

    /// What the backend would hand back for an insert.
    fn confirm_insert(write: &RecordWrite) -> AttendanceRecord {
        match write {
            RecordWrite::Insert(insert) => {
                AttendanceRecord::from_insert(Uuid::new_v4(), insert, Utc::now())
            }
            RecordWrite::Update { .. } => panic!("expected an insert"),
        }
    }

    #[test]
    fn added_student_takes_the_backend_id() {
        let mut workspace = Workspace::default();
        let ticket = workspace.begin_add_student(owner(), &draft("bala"), Utc::now());
        assert_eq!(workspace.students().next().unwrap().sync, SyncStatus::Pending);

        let stored = Student::from_draft(Uuid::new_v4(), owner(), &draft("bala"), Utc::now());
        workspace.commit(ticket, Confirmed::Student(stored.clone()));

        let students: Vec<_> = workspace.students().collect();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].value.id, stored.id);
        assert_eq!(students[0].sync, SyncStatus::Committed);
    }

    #[test]
    fn second_mark_updates_the_same_record() {
        let (mut workspace, student) = seeded();
        let slot = SlotKey::new(student.id, date());

        let (ticket, write) = workspace.begin_mark(owner(), slot, Status::Present, nine()).unwrap();
        assert!(write.is_insert());
        let stored = confirm_insert(&write);
        workspace.commit(ticket, Confirmed::Record(stored.clone()));

        let (ticket, write) = workspace.begin_mark(owner(), slot, Status::Absent, nine()).unwrap();
        match &write {
            RecordWrite::Update { id, update } => {
                assert_eq!(*id, stored.id);
                assert_eq!(update.time_in, Some(None));
            }
            RecordWrite::Insert(_) => panic!("second mark must not insert"),
        }
        let mut updated = stored.clone();
        updated.status = Status::Absent;
        updated.time_in = None;
        workspace.commit(ticket, Confirmed::Record(updated));

        assert_eq!(workspace.attendance().count(), 1);
        let record = workspace.record_for(slot).unwrap();
        assert_eq!(record.value.id, stored.id);
        assert_eq!(record.value.status, Status::Absent);
        assert_eq!(record.value.time_in, None);
        // embedded student survives a confirmation without the join
        assert_eq!(record.value.student.as_ref().map(|s| s.id), Some(student.id));
    }

    #[test]
    fn mark_while_insert_in_flight_is_rejected() {
        let (mut workspace, student) = seeded();
        let slot = SlotKey::new(student.id, date());

        let (_ticket, _) = workspace.begin_mark(owner(), slot, Status::Present, nine()).unwrap();
        let err = workspace
            .begin_mark(owner(), slot, Status::Late, nine())
            .unwrap_err();
        assert_eq!(err, StoreError::SlotBusy { date: date() });
        assert_eq!(workspace.attendance().count(), 1);
    }

    #[test]
    fn mark_for_unknown_student_fails() {
        let (mut workspace, _) = seeded();
        let stranger = Uuid::new_v4();
        let err = workspace
            .begin_mark(owner(), SlotKey::new(stranger, date()), Status::Present, nine())
            .unwrap_err();
        assert_eq!(err, StoreError::StudentNotFound(stranger));
    }

    #[test]
    fn failed_insert_frees_the_slot() {
        let (mut workspace, student) = seeded();
        let slot = SlotKey::new(student.id, date());

        let (ticket, _) = workspace.begin_mark(owner(), slot, Status::Present, nine()).unwrap();
        workspace.revert(ticket);

        assert!(workspace.record_for(slot).is_none());
        assert_eq!(workspace.attendance().count(), 0);
        let (_, write) = workspace.begin_mark(owner(), slot, Status::Present, nine()).unwrap();
        assert!(write.is_insert());
    }

    #[test]
    fn failed_update_restores_previous_value() {
        let (mut workspace, student) = seeded();
        let ticket = workspace
            .begin_update_student(
                student.id,
                &StudentUpdate {
                    name: Some("Asha K".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(workspace.student(student.id).unwrap().value.name, "Asha K");
        assert_eq!(
            workspace.begin_update_student(student.id, &StudentUpdate::default()).unwrap_err(),
            StoreError::Busy(student.id)
        );

        workspace.revert(ticket);
        let entry = workspace.student(student.id).unwrap();
        assert_eq!(entry.value.name, "asha");
        assert_eq!(entry.sync, SyncStatus::Failed);
    }

    #[test]
    fn delete_cascades_and_revert_restores() {
        let (mut workspace, student) = seeded();
        let other = Student::from_draft(Uuid::new_v4(), owner(), &draft("chitra"), Utc::now());
        let records = vec![
            AttendanceRecord::from_insert(
                Uuid::new_v4(),
                &AttendanceInsert {
                    user_id: owner(),
                    student_id: student.id,
                    date: date(),
                    time_in: None,
                    status: Status::Absent,
                },
                Utc::now(),
            ),
            AttendanceRecord::from_insert(
                Uuid::new_v4(),
                &AttendanceInsert {
                    user_id: owner(),
                    student_id: other.id,
                    date: date(),
                    time_in: None,
                    status: Status::Present,
                },
                Utc::now(),
            ),
        ];
        workspace.load(vec![student.clone(), other.clone()], records);

        let ticket = workspace.begin_delete_student(student.id).unwrap();
        assert!(workspace.student(student.id).is_none());
        assert!(workspace.attendance().all(|r| r.value.student_id != student.id));
        assert!(workspace.record_for(SlotKey::new(student.id, date())).is_none());
        assert_eq!(workspace.attendance().count(), 1);

        workspace.revert(ticket);
        assert_eq!(workspace.students().next().unwrap().value.id, student.id);
        assert_eq!(workspace.student(student.id).unwrap().sync, SyncStatus::Failed);
        assert_eq!(workspace.attendance().count(), 2);
        assert!(workspace.record_for(SlotKey::new(student.id, date())).is_some());
    }

    #[test]
    fn delete_waits_for_pending_attendance() {
        let (mut workspace, student) = seeded();
        let slot = SlotKey::new(student.id, date());

        let (insert, write) = workspace.begin_mark(owner(), slot, Status::Present, nine()).unwrap();
        assert_eq!(
            workspace.begin_delete_student(student.id).unwrap_err(),
            StoreError::Busy(student.id)
        );
        assert!(workspace.student(student.id).is_some());

        workspace.commit(insert, Confirmed::Record(confirm_insert(&write)));
        let delete = workspace.begin_delete_student(student.id).unwrap();
        workspace.revert(delete);

        let restored = workspace.record_for(slot).unwrap();
        assert_eq!(restored.sync, SyncStatus::Committed);
        let (_, write) = workspace.begin_mark(owner(), slot, Status::Absent, nine()).unwrap();
        assert!(!write.is_insert());
    }

    #[test]
    fn student_being_added_cannot_be_marked() {
        let mut workspace = Workspace::default();
        let _ticket = workspace.begin_add_student(owner(), &draft("bala"), Utc::now());
        let provisional = workspace.students().next().unwrap().value.id;

        let err = workspace
            .begin_mark(owner(), SlotKey::new(provisional, date()), Status::Present, nine())
            .unwrap_err();
        assert_eq!(err, StoreError::Busy(provisional));
        assert_eq!(workspace.attendance().count(), 0);
    }

    #[test]
    fn load_indexes_newest_record_per_slot() {
        let (_, student) = seeded();
        let insert = AttendanceInsert {
            user_id: owner(),
            student_id: student.id,
            date: date(),
            time_in: None,
            status: Status::Absent,
        };
        let newest = AttendanceRecord::from_insert(Uuid::new_v4(), &insert, Utc::now());
        let older = AttendanceRecord::from_insert(Uuid::new_v4(), &insert, Utc::now());

        let mut workspace = Workspace::default();
        workspace.load(vec![student.clone()], vec![newest.clone(), older]);
        assert_eq!(
            workspace.record_for(SlotKey::new(student.id, date())).unwrap().value.id,
            newest.id
        );
    }
}
