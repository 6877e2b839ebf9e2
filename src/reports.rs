use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::model::{
    Announcement, Class, DaySchedule, Priority, Record, ScheduleEntry, Student, Teacher,
    CLASS_CAPACITY, UNASSIGNED, WEEKDAYS,
};

/// How many announcements the dashboard overview shows.
pub const RECENT_ANNOUNCEMENTS: usize = 5;

/// Round-half-up of `num / den` in integer arithmetic; 0 when `den` is 0.
///
/// `floor(n/d + 0.5) == (2n + d) / 2d` for non-negative operands, so
/// `5/2` gives 3 and `7/2` gives 4.
pub fn ratio_rounded(num: u64, den: u64) -> u64 {
    if den == 0 {
        return 0;
    }
    (2 * num + den) / (2 * den)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeEnrollment {
    pub grade: String,
    pub class_count: usize,
    pub student_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectCount {
    pub subject: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityCounts {
    pub normal: usize,
    pub important: usize,
    pub urgent: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_teachers: usize,
    pub total_classes: usize,
    pub total_students: usize,
    pub total_announcements: usize,
    pub average_class_size: u64,
    pub student_teacher_ratio: u64,
    pub total_capacity: u64,
    pub capacity_utilization_percent: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub summary: ReportSummary,
    pub recent_announcements: Vec<Announcement>,
}

/// Students per grade. Classes sharing a grade label are merged; students
/// whose class is unknown are not counted. Ordered by grade label.
pub fn enrollment_by_grade(classes: &[Class], students: &[Student]) -> Vec<GradeEnrollment> {
    let mut per_class: HashMap<&str, usize> = HashMap::new();
    for s in students {
        *per_class.entry(s.class_id.as_str()).or_default() += 1;
    }

    let mut by_grade: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for c in classes {
        let label = match c.grade.trim() {
            "" => UNASSIGNED.to_string(),
            g => g.to_string(),
        };
        let slot = by_grade.entry(label).or_default();
        slot.0 += 1;
        slot.1 += per_class.get(c.id.as_str()).copied().unwrap_or(0);
    }

    by_grade
        .into_iter()
        .map(|(grade, (class_count, student_count))| GradeEnrollment {
            grade,
            class_count,
            student_count,
        })
        .collect()
}

pub fn teachers_by_subject(teachers: &[Teacher]) -> Vec<SubjectCount> {
    let mut by_subject: BTreeMap<&str, usize> = BTreeMap::new();
    for t in teachers {
        *by_subject.entry(t.subject.trim()).or_default() += 1;
    }
    by_subject
        .into_iter()
        .map(|(subject, count)| SubjectCount {
            subject: subject.to_string(),
            count,
        })
        .collect()
}

pub fn announcements_by_priority(announcements: &[Announcement]) -> PriorityCounts {
    let mut out = PriorityCounts::default();
    for a in announcements {
        match a.priority {
            Priority::Normal => out.normal += 1,
            Priority::Important => out.important += 1,
            Priority::Urgent => out.urgent += 1,
        }
    }
    out
}

pub fn summary(
    teachers: &[Teacher],
    classes: &[Class],
    students: &[Student],
    announcements: &[Announcement],
) -> ReportSummary {
    let t = teachers.len() as u64;
    let c = classes.len() as u64;
    let s = students.len() as u64;
    let capacity = c * CLASS_CAPACITY;
    ReportSummary {
        total_teachers: teachers.len(),
        total_classes: classes.len(),
        total_students: students.len(),
        total_announcements: announcements.len(),
        average_class_size: ratio_rounded(s, c),
        student_teacher_ratio: ratio_rounded(s, t),
        total_capacity: capacity,
        capacity_utilization_percent: ratio_rounded(100 * s, capacity),
    }
}

/// `announcements` is expected newest first, as the view holds them.
pub fn overview(
    teachers: &[Teacher],
    classes: &[Class],
    students: &[Student],
    announcements: &[Announcement],
) -> Overview {
    Overview {
        summary: summary(teachers, classes, students, announcements),
        recent_announcements: announcements
            .iter()
            .take(RECENT_ANNOUNCEMENTS)
            .cloned()
            .collect(),
    }
}

/// Weekly timetable from schedule records (one record per day, fields are
/// the day's entries). Weekdays come first in calendar order, any other day
/// keys follow in arrival order.
pub fn timetable(days: &[Record]) -> Vec<DaySchedule> {
    let mut known: Vec<(usize, DaySchedule)> = Vec::new();
    let mut other: Vec<DaySchedule> = Vec::new();
    for r in days {
        let entries: Vec<ScheduleEntry> = r
            .fields
            .iter()
            .filter_map(|(id, body)| ScheduleEntry::from_entry(id, body))
            .collect();
        let day = DaySchedule {
            day: r.id.clone(),
            entries,
        };
        match WEEKDAYS.iter().position(|d| *d == r.id) {
            Some(pos) => known.push((pos, day)),
            None => other.push(day),
        }
    }
    known.sort_by_key(|(pos, _)| *pos);
    known.into_iter().map(|(_, d)| d).chain(other).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn class(id: &str, grade: &str) -> Class {
        Class {
            id: id.into(),
            name: format!("Class {id}"),
            grade: grade.into(),
            teacher_id: String::new(),
            teacher_name: String::new(),
            created_at: None,
        }
    }

    fn student(id: &str, class_id: &str) -> Student {
        Student {
            id: id.into(),
            name: format!("Student {id}"),
            username: id.into(),
            password: String::new(),
            class_id: class_id.into(),
            class_name: String::new(),
            created_at: None,
        }
    }

    fn teacher(id: &str, subject: &str) -> Teacher {
        Teacher {
            id: id.into(),
            name: id.into(),
            username: id.into(),
            password: String::new(),
            subject: subject.into(),
            created_at: None,
        }
    }

    fn students(n: usize) -> Vec<Student> {
        (0..n).map(|i| student(&format!("s{i}"), "c")).collect()
    }

    fn classes(n: usize) -> Vec<Class> {
        (0..n).map(|i| class(&format!("c{i}"), "1")).collect()
    }

    #[test]
    fn average_class_size_is_zero_without_classes() {
        let s = summary(&[], &[], &students(7), &[]);
        assert_eq!(s.average_class_size, 0);
        assert_eq!(s.student_teacher_ratio, 0);
        assert_eq!(s.total_capacity, 0);
        assert_eq!(s.capacity_utilization_percent, 0);
    }

    #[test]
    fn average_class_size_rounds_half_up() {
        // 5 / 2 = 2.5 -> 3, 7 / 2 = 3.5 -> 4, 1 / 2 = 0.5 -> 1
        assert_eq!(summary(&[], &classes(2), &students(5), &[]).average_class_size, 3);
        assert_eq!(summary(&[], &classes(2), &students(7), &[]).average_class_size, 4);
        assert_eq!(summary(&[], &classes(2), &students(1), &[]).average_class_size, 1);
        // just below and above the boundary
        assert_eq!(summary(&[], &classes(4), &students(9), &[]).average_class_size, 2);
        assert_eq!(summary(&[], &classes(4), &students(11), &[]).average_class_size, 3);
        assert_eq!(summary(&[], &classes(3), &students(0), &[]).average_class_size, 0);
    }

    #[test]
    fn ratio_matches_float_rounding_on_a_grid() {
        for num in 0..60u64 {
            for den in 1..12u64 {
                let expected = ((num as f64 / den as f64) + 0.5).floor() as u64;
                assert_eq!(ratio_rounded(num, den), expected, "{num}/{den}");
            }
        }
    }

    #[test]
    fn capacity_uses_thirty_seats_per_class() {
        let s = summary(
            &[teacher("t1", "Math"), teacher("t2", "Art")],
            &classes(3),
            &students(45),
            &[],
        );
        assert_eq!(s.total_capacity, 90);
        assert_eq!(s.capacity_utilization_percent, 50);
        assert_eq!(s.student_teacher_ratio, 23);
    }

    #[test]
    fn enrollment_by_grade_splits_ten_students_over_two_classes() {
        let cls = vec![class("b", "8"), class("a", "10")];
        let mut st: Vec<Student> = (0..6).map(|i| student(&format!("x{i}"), "b")).collect();
        st.extend((0..4).map(|i| student(&format!("y{i}"), "a")));

        let rows = enrollment_by_grade(&cls, &st);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.iter().map(|r| r.student_count).sum::<usize>(), 10);
        // lexicographic: "10" sorts before "8"
        assert_eq!(rows[0].grade, "10");
        assert_eq!(rows[0].student_count, 4);
        assert_eq!(rows[1].grade, "8");
        assert_eq!(rows[1].student_count, 6);
    }

    #[test]
    fn classes_sharing_a_grade_merge() {
        let cls = vec![class("a", "7"), class("b", "7")];
        let st = vec![student("1", "a"), student("2", "b"), student("3", "gone")];
        let rows = enrollment_by_grade(&cls, &st);
        assert_eq!(
            rows,
            vec![GradeEnrollment {
                grade: "7".into(),
                class_count: 2,
                student_count: 2,
            }]
        );
    }

    #[test]
    fn teachers_group_by_subject() {
        let rows = teachers_by_subject(&[
            teacher("1", "Math"),
            teacher("2", "Art"),
            teacher("3", "Math"),
        ]);
        let math = rows.iter().find(|r| r.subject == "Math").expect("math");
        assert_eq!(math.count, 2);
        assert_eq!(rows.iter().map(|r| r.count).sum::<usize>(), 3);
    }

    #[test]
    fn timetable_orders_days_by_calendar() {
        let days = vec![
            Record::from_entry(
                "Wednesday".into(),
                json!({ "e2": { "subject": "Art", "time": "09:00" } }),
            )
            .expect("record"),
            Record::from_entry(
                "Monday".into(),
                json!({
                    "e1": { "subject": "Math", "time": "08:00" },
                    "e3": { "subject": "PE", "time": "10:00" }
                }),
            )
            .expect("record"),
        ];
        let tt = timetable(&days);
        let names: Vec<&str> = tt.iter().map(|d| d.day.as_str()).collect();
        assert_eq!(names, vec!["Monday", "Wednesday"]);
        let subjects: Vec<&str> = tt[0].entries.iter().map(|e| e.subject.as_str()).collect();
        assert_eq!(subjects, vec!["Math", "PE"]);
    }
}
