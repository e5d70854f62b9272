use anyhow::{bail, Context};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{NewStudent, RosterSummary, ScoreRecord};

pub async fn init_db(pool: &SqlitePool) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS students (
            id BLOB PRIMARY KEY,
            student_number TEXT NOT NULL UNIQUE,
            full_name TEXT NOT NULL,
            course TEXT NOT NULL,
            year_level INTEGER NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS grades (
            student_id BLOB NOT NULL UNIQUE REFERENCES students(id),
            attendance_rate REAL NOT NULL,
            quiz_score REAL NOT NULL,
            midterm_score REAL NOT NULL,
            final_score REAL NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    debug!("schema ready");
    Ok(())
}

pub async fn seed(pool: &SqlitePool) -> anyhow::Result<()> {
    let students = vec![
        ("23-1024", "Coleco, Rob", "BSIT", 3, 92.0, 85.0, 88.0, 91.0),
        ("23-1031", "Cruz, Lou", "BSIT", 3, 96.0, 90.0, 93.0, 95.0),
        ("23-1047", "Gonzales, John", "BSIT", 3, 74.0, 70.0, 68.0, 72.0),
        ("23-1052", "Mallorca, Mj", "BSIT", 3, 85.0, 78.0, 81.0, 76.0),
        ("23-1066", "Santos, Bea", "BSIT", 3, 61.0, 55.0, 62.0, 58.0),
    ];

    for (number, name, course, year, attendance, quiz, midterm, final_exam) in students {
        upsert_student_with_scores(
            pool,
            &NewStudent {
                student_number: number.to_string(),
                full_name: name.to_string(),
                course: course.to_string(),
                year_level: year,
                attendance,
                quiz,
                midterm,
                final_exam,
            },
        )
        .await?;
    }

    info!("seed roster inserted");
    Ok(())
}

/// Inserts a new student and their grading-period scores. A duplicate
/// student number is reported as such rather than as a bare driver error.
pub async fn add_student(pool: &SqlitePool, student: &NewStudent) -> anyhow::Result<()> {
    let id = Uuid::new_v4();
    let result = sqlx::query(
        r#"
        INSERT INTO students (id, student_number, full_name, course, year_level, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(id)
    .bind(&student.student_number)
    .bind(&student.full_name)
    .bind(&student.course)
    .bind(student.year_level)
    .bind(Utc::now())
    .execute(pool)
    .await;

    match result {
        Ok(_) => {}
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            bail!("student number {} already exists", student.student_number);
        }
        Err(err) => return Err(err).context("failed to insert student"),
    }

    sqlx::query(
        r#"
        INSERT INTO grades (student_id, attendance_rate, quiz_score, midterm_score, final_score)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(student.attendance)
    .bind(student.quiz)
    .bind(student.midterm)
    .bind(student.final_exam)
    .execute(pool)
    .await
    .context("failed to insert grades")?;

    Ok(())
}

/// Rewrites a student's name and scores, keyed by student number.
pub async fn update_student(
    pool: &SqlitePool,
    student_number: &str,
    full_name: &str,
    attendance: f64,
    quiz: f64,
    midterm: f64,
    final_exam: f64,
) -> anyhow::Result<()> {
    let updated = sqlx::query("UPDATE students SET full_name = $1 WHERE student_number = $2")
        .bind(full_name)
        .bind(student_number)
        .execute(pool)
        .await?;

    if updated.rows_affected() == 0 {
        bail!("no student with number {student_number}");
    }

    sqlx::query(
        r#"
        UPDATE grades
        SET attendance_rate = $1, quiz_score = $2, midterm_score = $3, final_score = $4
        WHERE student_id = (SELECT id FROM students WHERE student_number = $5)
        "#,
    )
    .bind(attendance)
    .bind(quiz)
    .bind(midterm)
    .bind(final_exam)
    .bind(student_number)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn delete_student(pool: &SqlitePool, student_number: &str) -> anyhow::Result<()> {
    sqlx::query(
        "DELETE FROM grades WHERE student_id = (SELECT id FROM students WHERE student_number = $1)",
    )
    .bind(student_number)
    .execute(pool)
    .await?;

    let deleted = sqlx::query("DELETE FROM students WHERE student_number = $1")
        .bind(student_number)
        .execute(pool)
        .await?;

    if deleted.rows_affected() == 0 {
        bail!("no student with number {student_number}");
    }
    Ok(())
}

/// The analytics input set: every student joined with their scores, queried
/// fresh each time. Nothing is cached between analytics requests.
pub async fn fetch_score_records(pool: &SqlitePool) -> anyhow::Result<Vec<ScoreRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT s.student_number, s.full_name,
               g.attendance_rate, g.quiz_score, g.midterm_score, g.final_score
        FROM students s
        JOIN grades g ON g.student_id = s.id
        ORDER BY s.full_name
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(score_record_from_row).collect())
}

pub async fn search_students(pool: &SqlitePool, term: &str) -> anyhow::Result<Vec<ScoreRecord>> {
    let pattern = format!("%{term}%");
    let rows = sqlx::query(
        r#"
        SELECT s.student_number, s.full_name,
               g.attendance_rate, g.quiz_score, g.midterm_score, g.final_score
        FROM students s
        JOIN grades g ON g.student_id = s.id
        WHERE s.full_name LIKE $1 OR s.student_number LIKE $1
        ORDER BY s.full_name
        "#,
    )
    .bind(pattern)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(score_record_from_row).collect())
}

pub async fn summary_stats(pool: &SqlitePool) -> anyhow::Result<RosterSummary> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(s.id) AS total, AVG(g.attendance_rate) AS avg_attendance
        FROM students s
        JOIN grades g ON g.student_id = s.id
        "#,
    )
    .fetch_one(pool)
    .await?;

    let total: i64 = row.get("total");
    let avg_attendance: Option<f64> = row.get("avg_attendance");

    Ok(RosterSummary {
        total_students: total,
        avg_attendance: (avg_attendance.unwrap_or(0.0) * 100.0).round() / 100.0,
    })
}

/// Imports a roster CSV. Existing students (by number) have their name and
/// scores refreshed; new students are inserted. Returns the row count.
pub async fn import_roster(pool: &SqlitePool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        student_number: String,
        full_name: String,
        course: String,
        year_level: i32,
        attendance: f64,
        quiz: f64,
        midterm: f64,
        #[serde(rename = "final")]
        final_exam: f64,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open roster {}", csv_path.display()))?;
    let mut imported = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result.context("malformed roster row")?;
        upsert_student_with_scores(
            pool,
            &NewStudent {
                student_number: row.student_number,
                full_name: row.full_name,
                course: row.course,
                year_level: row.year_level,
                attendance: row.attendance,
                quiz: row.quiz,
                midterm: row.midterm,
                final_exam: row.final_exam,
            },
        )
        .await?;
        imported += 1;
    }

    info!(imported, "roster import finished");
    Ok(imported)
}

async fn upsert_student_with_scores(pool: &SqlitePool, student: &NewStudent) -> anyhow::Result<()> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO students (id, student_number, full_name, course, year_level, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (student_number) DO UPDATE
        SET full_name = EXCLUDED.full_name, course = EXCLUDED.course,
            year_level = EXCLUDED.year_level
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&student.student_number)
    .bind(&student.full_name)
    .bind(&student.course)
    .bind(student.year_level)
    .bind(Utc::now())
    .fetch_one(pool)
    .await?
    .get("id");

    sqlx::query(
        r#"
        INSERT INTO grades (student_id, attendance_rate, quiz_score, midterm_score, final_score)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (student_id) DO UPDATE
        SET attendance_rate = EXCLUDED.attendance_rate, quiz_score = EXCLUDED.quiz_score,
            midterm_score = EXCLUDED.midterm_score, final_score = EXCLUDED.final_score
        "#,
    )
    .bind(id)
    .bind(student.attendance)
    .bind(student.quiz)
    .bind(student.midterm)
    .bind(student.final_exam)
    .execute(pool)
    .await?;

    Ok(())
}

fn score_record_from_row(row: sqlx::sqlite::SqliteRow) -> ScoreRecord {
    ScoreRecord {
        student_number: row.get("student_number"),
        full_name: row.get("full_name"),
        attendance: row.get("attendance_rate"),
        quiz: row.get("quiz_score"),
        midterm: row.get("midterm_score"),
        final_exam: row.get("final_score"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    // One connection so every query sees the same in-memory database.
    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_db(&pool).await.unwrap();
        pool
    }

    fn sample_student(number: &str, name: &str) -> NewStudent {
        NewStudent {
            student_number: number.to_string(),
            full_name: name.to_string(),
            course: "BSIT".to_string(),
            year_level: 3,
            attendance: 90.0,
            quiz: 80.0,
            midterm: 85.0,
            final_exam: 88.0,
        }
    }

    #[tokio::test]
    async fn add_and_fetch_round_trip() {
        let pool = test_pool().await;
        add_student(&pool, &sample_student("23-1001", "Reyes, Ana"))
            .await
            .unwrap();

        let records = fetch_score_records(&pool).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].student_number, "23-1001");
        assert_eq!(records[0].quiz, 80.0);
        assert_eq!(records[0].final_exam, 88.0);
    }

    #[tokio::test]
    async fn duplicate_student_number_is_reported() {
        let pool = test_pool().await;
        add_student(&pool, &sample_student("23-1001", "Reyes, Ana"))
            .await
            .unwrap();
        let err = add_student(&pool, &sample_student("23-1001", "Reyes, Bea"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn update_rewrites_name_and_scores() {
        let pool = test_pool().await;
        add_student(&pool, &sample_student("23-1001", "Reyes, Ana"))
            .await
            .unwrap();

        update_student(&pool, "23-1001", "Reyes-Cruz, Ana", 75.0, 60.0, 65.0, 70.0)
            .await
            .unwrap();

        let records = fetch_score_records(&pool).await.unwrap();
        assert_eq!(records[0].full_name, "Reyes-Cruz, Ana");
        assert_eq!(records[0].attendance, 75.0);
        assert_eq!(records[0].midterm, 65.0);
    }

    #[tokio::test]
    async fn update_of_unknown_student_fails() {
        let pool = test_pool().await;
        let err = update_student(&pool, "99-9999", "Nobody", 50.0, 50.0, 50.0, 50.0)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no student"));
    }

    #[tokio::test]
    async fn delete_removes_student_and_scores() {
        let pool = test_pool().await;
        add_student(&pool, &sample_student("23-1001", "Reyes, Ana"))
            .await
            .unwrap();
        delete_student(&pool, "23-1001").await.unwrap();
        assert!(fetch_score_records(&pool).await.unwrap().is_empty());
        assert!(delete_student(&pool, "23-1001").await.is_err());
    }

    #[tokio::test]
    async fn search_matches_name_or_number() {
        let pool = test_pool().await;
        add_student(&pool, &sample_student("23-1001", "Reyes, Ana"))
            .await
            .unwrap();
        add_student(&pool, &sample_student("24-2002", "Cruz, Ben"))
            .await
            .unwrap();

        let by_name = search_students(&pool, "reyes").await.unwrap();
        assert_eq!(by_name.len(), 1);
        let by_number = search_students(&pool, "24-").await.unwrap();
        assert_eq!(by_number.len(), 1);
        assert_eq!(by_number[0].full_name, "Cruz, Ben");
    }

    #[tokio::test]
    async fn seed_is_idempotent() {
        let pool = test_pool().await;
        seed(&pool).await.unwrap();
        let first = fetch_score_records(&pool).await.unwrap().len();
        seed(&pool).await.unwrap();
        let second = fetch_score_records(&pool).await.unwrap().len();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn summary_averages_attendance() {
        let pool = test_pool().await;
        let mut a = sample_student("23-1001", "Reyes, Ana");
        a.attendance = 80.0;
        let mut b = sample_student("23-1002", "Cruz, Ben");
        b.attendance = 91.0;
        add_student(&pool, &a).await.unwrap();
        add_student(&pool, &b).await.unwrap();

        let summary = summary_stats(&pool).await.unwrap();
        assert_eq!(summary.total_students, 2);
        assert_eq!(summary.avg_attendance, 85.5);
    }
}
