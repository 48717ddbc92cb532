use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{CoreError, Result};

// ---------------------------------------------------------------------------
// Clock time
// ---------------------------------------------------------------------------

/// Local wall-clock time of day, 24h, minute precision.
///
/// The feed publishes times as `"HH:MM"` strings; single-digit hours
/// (`"9:05"`) are accepted on input, output is always zero-padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime {
    hour: u8,
    minute: u8,
}

impl ClockTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(CoreError::InvalidTime(format!("{hour:02}:{minute:02}")));
        }
        Ok(Self { hour, minute })
    }

    /// Build a time at compile time, clamping out-of-range parts to 23:59.
    pub const fn saturating(hour: u8, minute: u8) -> Self {
        Self {
            hour: if hour > 23 { 23 } else { hour },
            minute: if minute > 59 { 59 } else { minute },
        }
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// `hour * 60 + minute`, the unit every window comparison uses.
    pub fn minute_of_day(&self) -> u32 {
        self.hour as u32 * 60 + self.minute as u32
    }

    pub fn from_naive(time: NaiveTime) -> Self {
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
        }
    }

    pub fn to_naive(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour as u32, self.minute as u32, 0).unwrap_or_default()
    }

    /// Render as a 12-hour clock string: `"9:05 AM"`, `"12:00 PM"`.
    pub fn to_12_hour(&self) -> String {
        let suffix = if self.hour >= 12 { "PM" } else { "AM" };
        let hour = match self.hour % 12 {
            0 => 12,
            h => h,
        };
        format!("{hour}:{:02} {suffix}", self.minute)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl std::str::FromStr for ClockTime {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CoreError::InvalidTime(s.to_string());
        let (hour, minute) = s.trim().split_once(':').ok_or_else(invalid)?;
        let hour: u8 = hour.trim().parse().map_err(|_| invalid())?;
        let minute: u8 = minute.trim().parse().map_err(|_| invalid())?;
        Self::new(hour, minute)
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Weekday
// ---------------------------------------------------------------------------

/// The seven weekday literals used as schedule keys, Sunday-first like the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    pub fn from_chrono(day: chrono::Weekday) -> Self {
        Self::ALL[day.num_days_from_sunday() as usize]
    }

    /// Weekday of a calendar date.
    pub fn of(date: NaiveDate) -> Self {
        Self::from_chrono(date.weekday())
    }

    /// 0 = Sunday … 6 = Saturday.
    pub fn days_from_sunday(self) -> u32 {
        self as u32
    }

    /// The following day, wrapping Saturday → Sunday.
    pub fn succ(self) -> Self {
        Self::ALL[(self.days_from_sunday() as usize + 1) % 7]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Sunday => "Sunday",
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Weekday {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|day| day.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown weekday: {s}"))
    }
}

// ---------------------------------------------------------------------------
// Group tag
// ---------------------------------------------------------------------------

/// Which subset of students a class applies to.
///
/// The feed is inconsistent about spacing (`"Group 1"` vs `"Group1"`), so
/// equality, ordering and hashing all ignore whitespace. The raw label is
/// kept for display and round-tripping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupTag(String);

impl GroupTag {
    /// Sentinel tag for classes every group attends.
    pub const ALL_LABEL: &'static str = "All";

    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn all() -> Self {
        Self(Self::ALL_LABEL.to_string())
    }

    /// The two groups a section is split into.
    pub fn defaults() -> Vec<GroupTag> {
        vec![GroupTag::new("Group 1"), GroupTag::new("Group 2")]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_all(&self) -> bool {
        self.key() == Self::ALL_LABEL
    }

    fn key(&self) -> String {
        self.0.chars().filter(|c| !c.is_whitespace()).collect()
    }
}

impl PartialEq for GroupTag {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for GroupTag {}

impl Hash for GroupTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for GroupTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupTag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl fmt::Display for GroupTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupTag {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl Default for GroupTag {
    fn default() -> Self {
        Self::all()
    }
}

// ---------------------------------------------------------------------------
// Class entries
// ---------------------------------------------------------------------------

/// Kind of session. `Free` marks a gap in the day rather than a real class.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClassType {
    #[default]
    Lecture,
    Lab,
    Free,
    /// Any other label the feed uses, kept verbatim.
    Other(String),
}

impl ClassType {
    pub fn as_str(&self) -> &str {
        match self {
            ClassType::Lecture => "Lecture",
            ClassType::Lab => "Lab",
            ClassType::Free => "Free",
            ClassType::Other(label) => label,
        }
    }
}

impl From<String> for ClassType {
    fn from(label: String) -> Self {
        match label.trim() {
            "Lecture" => ClassType::Lecture,
            "Lab" => ClassType::Lab,
            "Free" => ClassType::Free,
            _ => ClassType::Other(label),
        }
    }
}

impl From<ClassType> for String {
    fn from(class_type: ClassType) -> Self {
        class_type.as_str().to_string()
    }
}

/// One scheduled session or free block within a day.
///
/// Field names follow the published feed (`Course_Name`, `Start_Time`, …).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassInfo {
    #[serde(rename = "Period", default, deserialize_with = "de_period")]
    pub period: u32,
    #[serde(rename = "Start_Time")]
    pub start_time: ClockTime,
    #[serde(rename = "End_Time")]
    pub end_time: ClockTime,
    #[serde(rename = "Course_Name", default)]
    pub course_name: String,
    #[serde(rename = "Instructor", default)]
    pub instructor: String,
    #[serde(rename = "Building", default)]
    pub building: String,
    #[serde(rename = "Room", default, deserialize_with = "de_text")]
    pub room: String,
    #[serde(rename = "Group", default)]
    pub group: GroupTag,
    #[serde(rename = "Class_type", default)]
    pub class_type: ClassType,
}

impl ClassInfo {
    pub fn is_free(&self) -> bool {
        self.class_type == ClassType::Free
    }

    /// True when `minute_of_day` falls in `[start, end)`.
    pub fn covers(&self, minute_of_day: u32) -> bool {
        self.start_time.minute_of_day() <= minute_of_day
            && minute_of_day < self.end_time.minute_of_day()
    }
}

/// The feed sends `Period` as either a number or a numeric string.
fn de_period<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u32, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(u32),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Number(n) => Ok(n),
        Repr::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Room numbers arrive as strings or bare numbers.
fn de_text<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Null => Ok(String::new()),
        other => Ok(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Weekly schedule
// ---------------------------------------------------------------------------

/// Weekday → chronologically ordered class entries.
///
/// An absent day reads as an empty slice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeeklySchedule {
    days: BTreeMap<Weekday, Vec<ClassInfo>>,
}

/// An entry that breaks the per-day ordering or window invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleViolation {
    pub day: Weekday,
    pub period: u32,
    pub reason: &'static str,
}

impl fmt::Display for ScheduleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} period {}: {}", self.day, self.period, self.reason)
    }
}

impl WeeklySchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_days(days: impl IntoIterator<Item = (Weekday, Vec<ClassInfo>)>) -> Self {
        Self {
            days: days.into_iter().collect(),
        }
    }

    pub fn day(&self, day: Weekday) -> &[ClassInfo] {
        self.days.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Days present as keys, including days whose list is empty.
    pub fn days(&self) -> impl Iterator<Item = (Weekday, &[ClassInfo])> {
        self.days.iter().map(|(day, classes)| (*day, classes.as_slice()))
    }

    pub fn has_day(&self, day: Weekday) -> bool {
        self.days.contains_key(&day)
    }

    pub fn set_day(&mut self, day: Weekday, classes: Vec<ClassInfo>) {
        self.days.insert(day, classes);
    }

    pub fn class_count(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    /// True when no day holds any entry.
    pub fn is_empty(&self) -> bool {
        self.class_count() == 0
    }

    /// Stable-sort every day by start time.
    pub fn normalized(mut self) -> Self {
        for classes in self.days.values_mut() {
            classes.sort_by_key(|class| class.start_time);
        }
        self
    }

    /// Entries with an empty window or a non-increasing period.
    pub fn violations(&self) -> Vec<ScheduleViolation> {
        let mut found = Vec::new();
        for (day, classes) in &self.days {
            for (i, class) in classes.iter().enumerate() {
                if class.start_time >= class.end_time {
                    found.push(ScheduleViolation {
                        day: *day,
                        period: class.period,
                        reason: "start time is not before end time",
                    });
                }
                if i > 0 && classes[i - 1].period >= class.period {
                    found.push(ScheduleViolation {
                        day: *day,
                        period: class.period,
                        reason: "period does not increase",
                    });
                }
            }
        }
        found
    }
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The user's selection: which section's schedule to fetch and which group
/// within it to keep.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub university: String,
    pub program: String,
    pub semester: String,
    pub section: String,
    pub group: GroupTag,
}

impl Identity {
    /// Parse a dash-joined schedule id (`UNIV-CS-3-A`) plus the group choice.
    pub fn parse(schedule_id: &str, group: GroupTag) -> Result<Self> {
        let parts: Vec<&str> = schedule_id.trim().split('-').map(str::trim).collect();
        match parts.as_slice() {
            [university, program, semester, section]
                if parts.iter().all(|part| !part.is_empty()) =>
            {
                Ok(Self {
                    university: university.to_string(),
                    program: program.to_string(),
                    semester: semester.to_string(),
                    section: section.to_string(),
                    group,
                })
            }
            _ => Err(CoreError::InvalidIdentity(format!(
                "expected UNIVERSITY-PROGRAM-SEMESTER-SECTION, got '{schedule_id}'"
            ))),
        }
    }

    /// Remote lookup key.
    pub fn schedule_id(&self) -> String {
        format!(
            "{}-{}-{}-{}",
            self.university, self.program, self.semester, self.section
        )
    }

    /// Header text: `UNIV - CS - 3 - A (Group 1)`.
    pub fn display_label(&self) -> String {
        format!("{} ({})", self.schedule_id().replace('-', " - "), self.group)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.schedule_id(), self.group)
    }
}

// ---------------------------------------------------------------------------
// Holiday
// ---------------------------------------------------------------------------

/// A date on which no classes are held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
}
