use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use survey_service::export::write_answer_rows;
use survey_service::logging::init_tracing;
use survey_service::prelude::*;
use survey_store::Snapshot;

fn cli() -> Command {
    Command::new("survey-admin")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Survey store administration")
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .subcommand_required(true)
        .subcommand(Command::new("config").about("Print the effective configuration"))
        .subcommand(
            Command::new("verify")
                .about("Check a snapshot's references, ownership and audit chain")
                .arg(snapshot_arg().required(true)),
        )
        .subcommand(
            Command::new("export")
                .about("Export the answers of one research as CSV")
                .arg(snapshot_arg().required(true))
                .arg(
                    Arg::new("research")
                        .long("research")
                        .required(true)
                        .value_parser(value_parser!(u64))
                        .help("Research id"),
                )
                .arg(
                    Arg::new("out")
                        .long("out")
                        .value_parser(value_parser!(PathBuf))
                        .help("Output file (stdout when omitted)"),
                ),
        )
        .subcommand(
            Command::new("demo")
                .about("Walk a research through its lifecycle and print the export")
                .arg(snapshot_arg())
                .arg(
                    Arg::new("quiet")
                        .long("quiet")
                        .action(ArgAction::SetTrue)
                        .help("Skip printing the CSV"),
                ),
        )
}

fn snapshot_arg() -> Arg {
    Arg::new("snapshot")
        .long("snapshot")
        .value_parser(value_parser!(PathBuf))
        .help("JSON snapshot file")
}

fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ServiceConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServiceConfig::default(),
    };
    init_tracing(&config.logging)?;

    match matches.subcommand() {
        Some(("config", _)) => {
            print!("{}", config.to_toml_redacted()?);
        }
        Some(("verify", args)) => {
            let path = required_path(args, "snapshot")?;
            let snapshot = Snapshot::read_from(path)?;
            let counts = snapshot.tables.counts();
            println!("Snapshot: {}", path.display());
            println!("  Researches:     {}", counts.researches);
            println!("  Questionnaires: {}", counts.questionnaires);
            println!("  Questions:      {}", counts.questions);
            println!("  Alternatives:   {}", counts.alternatives);
            println!("  Answers:        {}", counts.answers);
            println!("  Audit events:   {}", snapshot.audit.len());

            let problems = snapshot.problems();
            if problems.is_empty() {
                println!("Integrity: VALID");
            } else {
                println!("Integrity: INVALID");
                for problem in &problems {
                    println!("  - {problem}");
                }
                std::process::exit(1);
            }
        }
        Some(("export", args)) => {
            let path = required_path(args, "snapshot")?;
            let research = args
                .get_one::<u64>("research")
                .copied()
                .map(ResearchId)
                .context("--research is required")?;
            let snapshot = Snapshot::read_from(path)?;
            if snapshot.tables.research_unscoped(research).is_none() {
                bail!("research {research} not found in {}", path.display());
            }
            let rows = snapshot.tables.answer_rows_unscoped(research);
            let written = match args.get_one::<PathBuf>("out") {
                Some(out) => {
                    let file = File::create(out)
                        .with_context(|| format!("creating {}", out.display()))?;
                    write_answer_rows(&rows, file)?
                }
                None => write_answer_rows(&rows, io::stdout().lock())?,
            };
            eprintln!("{written} row(s) exported");
        }
        Some(("demo", args)) => {
            let mut config = config;
            if let Some(path) = args.get_one::<PathBuf>("snapshot") {
                config.storage.snapshot_path = Some(path.clone());
            }
            let handle = SurveyHandle::new(config)?;
            let csv = run_demo(&handle)?;
            if !args.get_flag("quiet") {
                io::stdout().write_all(&csv)?;
            }
            if handle.persist()? {
                eprintln!("snapshot written");
            }
        }
        _ => {}
    }
    Ok(())
}

fn required_path<'a>(args: &'a ArgMatches, name: &str) -> anyhow::Result<&'a Path> {
    args.get_one::<PathBuf>(name)
        .map(PathBuf::as_path)
        .with_context(|| format!("--{name} is required"))
}

/// Seed one researcher, one subject and an answered research.
fn run_demo(handle: &SurveyHandle) -> anyhow::Result<Vec<u8>> {
    let token = handle.register_researcher(NewUser {
        username: "researcher@example.org".into(),
        full_name: Some("Demo Researcher".into()),
        password: "demo-password".into(),
    })?;
    let owner = handle.authenticate_researcher(&token.access_token)?;

    let research = handle.create_research(
        owner,
        NewResearch::new("Sleep habits", Visibility::Public)
            .with_description("How long do you sleep?"),
    )?;
    let scope = ResearchScope::new(owner, research.id);
    let questionnaire =
        handle.create_questionnaire(scope, NewQuestionnaire::new("Sleep", Publicity::Public))?;
    let question = handle.create_question(
        scope.questionnaire(questionnaire.id),
        NewQuestion::new("Hours per night", 1).with_kind("radio"),
    )?;
    let question_scope = scope.questionnaire(questionnaire.id).question(question.id);
    let mut alternatives = Vec::new();
    for (text, value) in [("less than 6h", 5), ("6h to 8h", 7), ("more than 8h", 9)] {
        alternatives.push(
            handle.create_alternative(question_scope, NewAlternative::new("radio", text, value))?,
        );
    }
    handle.toggle_status(owner, research.id)?;

    let token = handle.register_subject(NewSubject {
        username: "529.982.247-25".into(),
        password: "demo-password".into(),
        chosen_name: Some("Demo Subject".into()),
        profile: SubjectProfile::default(),
    })?;
    let subject = handle.authenticate_subject(&token.access_token)?;
    handle.enroll(subject, research.id, None)?;
    let chosen = &alternatives[1];
    handle.submit_answers(
        subject,
        research.id,
        vec![AnswerInput::new(chosen.id, chosen.text.clone()).with_text("weekdays")],
    )?;

    let mut csv = Vec::new();
    handle.export_answers(scope, &mut csv)?;
    Ok(csv)
}
