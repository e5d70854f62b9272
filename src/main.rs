use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use sqlx::sqlite::SqlitePoolOptions;

mod analytics;
mod config;
mod db;
mod error;
mod models;
mod report;
mod standing;

use analytics::AnalyticsEngine;
use config::Settings;
use error::AnalyticsError;
use models::{GradingWeights, NewStudent};

#[derive(Parser)]
#[command(name = "grade-tracker")]
#[command(about = "Student academic record tracker with GPA analytics", long_about = None)]
struct Cli {
    /// Path to the grading-weight settings file
    #[arg(long, global = true, default_value = "settings.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema
    InitDb,
    /// Load a small sample roster
    Seed,
    /// Import students and scores from a roster CSV
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Add one student with their grading-period scores
    Add {
        #[arg(long)]
        student_number: String,
        #[arg(long)]
        full_name: String,
        #[arg(long, default_value = "BSIT")]
        course: String,
        #[arg(long, default_value_t = 3)]
        year_level: i32,
        #[arg(long)]
        attendance: f64,
        #[arg(long)]
        quiz: f64,
        #[arg(long)]
        midterm: f64,
        #[arg(long = "final")]
        final_exam: f64,
    },
    /// Rewrite a student's name and scores
    Update {
        #[arg(long)]
        student_number: String,
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        attendance: f64,
        #[arg(long)]
        quiz: f64,
        #[arg(long)]
        midterm: f64,
        #[arg(long = "final")]
        final_exam: f64,
    },
    /// Delete a student and their scores
    Remove {
        #[arg(long)]
        student_number: String,
    },
    /// List students with their weighted GPA
    List {
        /// Filter by name or student number
        #[arg(long)]
        search: Option<String>,
    },
    /// Class-level performance summary
    Summary,
    /// Fit the attendance-to-GPA trend, optionally forecasting one student
    Predict {
        /// Attendance rate to forecast a GPA for
        #[arg(long)]
        attendance: Option<f64>,
    },
    /// Dean's list and at-risk students
    Standing,
    /// Write the full markdown report
    Report {
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Validate and persist new grading weights
    SetWeights {
        #[arg(long)]
        quiz: f64,
        #[arg(long)]
        midterm: f64,
        #[arg(long = "final")]
        final_exam: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(&cli.config)?;
    let engine = AnalyticsEngine::new(settings.grading_weights);

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:edumatrix.db?mode=rwc".to_string());

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to open the student database")?;

    match cli.command {
        Commands::SetWeights {
            quiz,
            midterm,
            final_exam,
        } => {
            settings.save_weights(
                &cli.config,
                GradingWeights {
                    quiz,
                    midterm,
                    final_exam,
                },
            )?;
            println!(
                "Grading weights saved to {}. They apply from the next run.",
                cli.config.display()
            );
        }
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::init_db(&pool).await?;
            db::seed(&pool).await?;
            println!("Sample roster inserted.");
        }
        Commands::Import { csv } => {
            let imported = db::import_roster(&pool, &csv).await?;
            println!("Imported {imported} roster rows from {}.", csv.display());
        }
        Commands::Add {
            student_number,
            full_name,
            course,
            year_level,
            attendance,
            quiz,
            midterm,
            final_exam,
        } => {
            validate_student_number(&student_number)?;
            validate_scores(attendance, quiz, midterm, final_exam)?;
            let student = NewStudent {
                student_number,
                full_name,
                course,
                year_level,
                attendance,
                quiz,
                midterm,
                final_exam,
            };
            db::add_student(&pool, &student).await?;
            println!(
                "Record created for {} ({}).",
                student.full_name, student.student_number
            );
        }
        Commands::Update {
            student_number,
            full_name,
            attendance,
            quiz,
            midterm,
            final_exam,
        } => {
            validate_scores(attendance, quiz, midterm, final_exam)?;
            db::update_student(
                &pool,
                &student_number,
                &full_name,
                attendance,
                quiz,
                midterm,
                final_exam,
            )
            .await?;
            println!("Record updated for {student_number}.");
        }
        Commands::Remove { student_number } => {
            db::delete_student(&pool, &student_number).await?;
            println!("Record deleted for {student_number}.");
        }
        Commands::List { search } => {
            let records = match search.as_deref() {
                Some(term) => db::search_students(&pool, term).await?,
                None => db::fetch_score_records(&pool).await?,
            };
            if records.is_empty() {
                println!("No matching student records.");
            } else {
                for record in &records {
                    let gpa = engine.weighted_gpa(record.quiz, record.midterm, record.final_exam);
                    println!(
                        "- {} ({}) attendance {:.0}%, GPA {:.2}",
                        record.full_name, record.student_number, record.attendance, gpa
                    );
                }
            }
        }
        Commands::Summary => {
            let summary = db::summary_stats(&pool).await?;
            let records = db::fetch_score_records(&pool).await?;
            let grades: Vec<f64> = records
                .iter()
                .map(|r| engine.weighted_gpa(r.quiz, r.midterm, r.final_exam))
                .collect();
            let performance = engine.class_performance(&grades);
            let weights = engine.weights();
            println!(
                "Grading weights: quiz {:.0}%, midterm {:.0}%, final {:.0}%",
                weights.quiz * 100.0,
                weights.midterm * 100.0,
                weights.final_exam * 100.0
            );
            println!("Students on file: {}", summary.total_students);
            println!("Average attendance: {:.2}%", summary.avg_attendance);
            println!("Class average (GPA): {:.2}", performance.average);
            println!("Pass rate: {:.1}%", performance.pass_rate);
        }
        Commands::Predict { attendance } => {
            if let Some(rate) = attendance {
                ensure_score_range("attendance", rate)?;
            }
            let records = db::fetch_score_records(&pool).await?;
            let rates: Vec<f64> = records.iter().map(|r| r.attendance).collect();
            let grades: Vec<f64> = records
                .iter()
                .map(|r| engine.weighted_gpa(r.quiz, r.midterm, r.final_exam))
                .collect();

            match engine.predict_performance(&rates, &grades) {
                Ok(None) => {
                    println!("Need at least 2 student records to fit the attendance trend.");
                }
                Err(AnalyticsError::DegenerateAttendance) => {
                    println!(
                        "Cannot predict trend: all students have the same attendance rate. \
                         Add varied data points."
                    );
                }
                Ok(Some(fit)) => {
                    println!(
                        "Trend: GPA = {:.4} x attendance + {:.4}",
                        fit.slope, fit.intercept
                    );
                    println!(
                        "Correlation {:.4}, R-squared {:.4}",
                        fit.correlation, fit.r_squared
                    );
                    println!("{}", analytics::insight_text(fit.correlation));
                    if let Some(rate) = attendance {
                        println!(
                            "Forecast GPA at {:.0}% attendance: {:.2}",
                            rate,
                            engine.forecast_gpa(&fit, rate)
                        );
                    }
                }
            }
        }
        Commands::Standing => {
            let records = db::fetch_score_records(&pool).await?;
            let review = standing::review_standing(&records, &engine);

            println!("Dean's List (GPA >= {}):", standing::DEANS_LIST_THRESHOLD);
            if review.deans_list.is_empty() {
                println!("  none");
            }
            for entry in &review.deans_list {
                println!(
                    "- {} ({}) GPA {:.2}",
                    entry.full_name, entry.student_number, entry.gpa
                );
            }

            println!("At-risk students:");
            if review.at_risk.is_empty() {
                println!("  none");
            }
            for entry in &review.at_risk {
                println!(
                    "- {} ({}) GPA {:.2}, attendance {:.0}%: {}",
                    entry.full_name,
                    entry.student_number,
                    entry.gpa,
                    entry.attendance,
                    entry.reasons_label()
                );
            }
        }
        Commands::Report { out } => {
            let records = db::fetch_score_records(&pool).await?;
            let report = report::build_report(&records, &engine, chrono::Utc::now().date_naive());
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write report to {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}

/// Student numbers follow the registrar's `NN-NNNN` format.
fn validate_student_number(value: &str) -> anyhow::Result<()> {
    let bytes = value.as_bytes();
    let well_formed = bytes.len() == 7
        && bytes[..2].iter().all(u8::is_ascii_digit)
        && bytes[2] == b'-'
        && bytes[3..].iter().all(u8::is_ascii_digit);
    if !well_formed {
        bail!("student number must follow the format XX-XXXX, e.g. 23-1024");
    }
    Ok(())
}

fn validate_scores(attendance: f64, quiz: f64, midterm: f64, final_exam: f64) -> anyhow::Result<()> {
    ensure_score_range("attendance", attendance)?;
    ensure_score_range("quiz", quiz)?;
    ensure_score_range("midterm", midterm)?;
    ensure_score_range("final", final_exam)?;
    Ok(())
}

fn ensure_score_range(label: &str, value: f64) -> anyhow::Result<()> {
    if !(0.0..=100.0).contains(&value) {
        bail!("{label} must be between 0 and 100, got {value}");
    }
    Ok(())
}
