use crate::infra::{
    parse_document, parse_kind, seed_demo_store, DEMO_COMPANY, DEMO_COURSE, DEMO_INSTITUTION,
    DEMO_JOB,
};
use clap::Args;
use lesotho_portal::clock::SystemClock;
use lesotho_portal::config::AppConfig;
use lesotho_portal::error::AppError;
use lesotho_portal::store::{Document, MemoryDocumentStore};
use lesotho_portal::workflows::opportunities::{
    evaluate_eligibility, posting_from_document, student_from_document, ApplicationStatus,
    ApplyError, OpportunityService, PortalSession, PostingId, PostingKind, PublishReport,
    StudentId,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Maximum number of students published concurrently (defaults to configuration)
    #[arg(long)]
    pub(crate) concurrency: Option<usize>,
    /// Print publication reports as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct EligibilityArgs {
    /// Student document as a JSON object
    #[arg(long, value_parser = parse_document)]
    pub(crate) student: Document,
    /// Posting document as a JSON object
    #[arg(long, value_parser = parse_document)]
    pub(crate) posting: Document,
    /// Posting kind: job or course
    #[arg(long, value_parser = parse_kind, default_value = "course")]
    pub(crate) kind: PostingKind,
}

pub(crate) fn run_eligibility(args: EligibilityArgs) -> Result<(), AppError> {
    let student = student_from_document("cli-student", &args.student);
    let posting = posting_from_document(args.kind, "cli-posting", &args.posting);
    let verdict = evaluate_eligibility(&student, &posting);

    println!("{}", serde_json::to_string_pretty(&verdict)?);
    Ok(())
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let Some(concurrency) = args.concurrency {
        config.portal.publish_concurrency = concurrency.max(1);
    }

    let store = MemoryDocumentStore::new();
    seed_demo_store(&store)?;
    let service = OpportunityService::new(
        Arc::new(store.clone()),
        Arc::new(SystemClock),
        &config.portal,
    );
    let course = PostingId(DEMO_COURSE.to_string());
    let job = PostingId(DEMO_JOB.to_string());

    println!("Lesotho Opportunities demo");
    println!(
        "Publishing up to {} students concurrently",
        config.portal.publish_concurrency
    );

    println!("\nOpen courses for stu-mpho");
    for view in service
        .open_postings(&StudentId("stu-mpho".to_string()), PostingKind::Course)
        .await?
    {
        let apply = if view.verdict.is_qualified {
            "Apply".to_string()
        } else {
            format!("Apply disabled ({})", view.verdict.badges.join("; "))
        };
        println!("- {} | {}", view.posting.title, apply);
    }

    println!("\nCourse applications");
    let mut applications = Vec::new();
    for student in ["stu-palesa", "stu-thabo", "stu-mpho", "stu-lineo"] {
        let session = PortalSession::student(student);
        match service.apply(&session, PostingKind::Course, &course).await {
            Ok(application) => {
                println!("- {student}: submitted {}", application.id);
                applications.push(application);
            }
            Err(ApplyError::NotEligible(verdict)) => {
                println!("- {student}: not eligible ({})", verdict.badges.join("; "));
            }
            Err(err) => println!("- {student}: rejected ({err})"),
        }
    }

    println!("\nRegistrar decisions");
    let registrar = PortalSession::institution(DEMO_INSTITUTION);
    let decisions = [
        ApplicationStatus::Accepted,
        ApplicationStatus::Waitlisted,
        ApplicationStatus::Rejected,
    ];
    for (application, decision) in applications.iter().zip(decisions) {
        match service
            .review(&registrar, PostingKind::Course, &application.id, decision)
            .await
        {
            Ok(reviewed) => println!(
                "- {}: {}",
                reviewed.student_id,
                reviewed.status.label()
            ),
            Err(err) => println!("- {}: review failed ({err})", application.student_id),
        }
    }

    for run in ["first", "repeat"] {
        let report = service
            .publish_posting(&registrar, PostingKind::Course, &course, &[])
            .await?;
        render_report(&format!("Course publication ({run} run)"), &report, args.json)?;
    }

    println!("\nJob application");
    let palesa = PortalSession::student("stu-palesa");
    match service.apply(&palesa, PostingKind::Job, &job).await {
        Ok(application) => {
            let employer = PortalSession::company(DEMO_COMPANY);
            if let Err(err) = service
                .review(
                    &employer,
                    PostingKind::Job,
                    &application.id,
                    ApplicationStatus::Accepted,
                )
                .await
            {
                println!("- stu-palesa: review failed ({err})");
                return Ok(());
            }
            let report = service
                .publish_posting(&employer, PostingKind::Job, &job, &[])
                .await?;
            render_report("Job publication", &report, args.json)?;
        }
        Err(err) => println!("- stu-palesa: {err}"),
    }

    println!("\nAdmission results");
    for student in ["stu-palesa", "stu-thabo", "stu-mpho", "stu-lineo"] {
        let ledger = service
            .admissions_for(&StudentId(student.to_string()))
            .await?;
        if ledger.is_empty() {
            println!("- {student}: none");
            continue;
        }
        for record in ledger.records() {
            println!(
                "- {student}: {} at {} ({})",
                record.program,
                record.name,
                record.status.label()
            );
        }
    }

    Ok(())
}

fn render_report(title: &str, report: &PublishReport, json: bool) -> Result<(), AppError> {
    println!("\n{title}");
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!(
        "- {} succeeded | {} failed | {} skipped",
        report.succeeded.len(),
        report.failed.len(),
        report.skipped.len()
    );
    for failure in &report.failures {
        println!("  - {}: {}", failure.student_id, failure.reason);
    }
    Ok(())
}
