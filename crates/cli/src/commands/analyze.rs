//! `calmwire analyze` — run one message through the mediation pipeline.

use calmwire_analysis::{
    PrefilterVerdict, RuleDetector, UserIntent, classify, detect_conflict_patterns, infer_intent,
    red_flags,
};
use calmwire_config::MediatorConfig;
use calmwire_core::Result;
use calmwire_core::analysis::{DetectorContext, DetectorReport};
use calmwire_core::message::{Contact, Message, Participant, RoomRoster};
use calmwire_core::state::ConflictPatterns;
use calmwire_mediator::{AnalysisRequest, Mediator};
use serde::Serialize;
use std::path::Path;

use super::config_error;

#[derive(Debug, clap::Args)]
pub struct AnalyzeArgs {
    /// The message to analyze
    #[arg(short, long)]
    pub text: String,

    /// Sender identity
    #[arg(long, default_value = "sender")]
    pub sender: String,

    /// Receiver identity
    #[arg(long, default_value = "receiver")]
    pub receiver: String,

    /// Room identity
    #[arg(long, default_value = "cli")]
    pub room: String,

    #[arg(long)]
    pub sender_name: Option<String>,

    #[arg(long)]
    pub receiver_name: Option<String>,

    /// A child's name; repeat for each child
    #[arg(long = "child")]
    pub children: Vec<String>,

    /// An earlier room message as "identity: text", oldest first; repeatable
    #[arg(long = "history")]
    pub history: Vec<String>,

    /// Only run the local checks, without calling the inference service
    #[arg(long)]
    pub dry_run: bool,
}

impl AnalyzeArgs {
    fn roster(&self) -> RoomRoster {
        let participant = |id: &str, name: &Option<String>| {
            let p = Participant::new(id);
            match name {
                Some(name) => p.with_display_name(name),
                None => p,
            }
        };
        let contacts = self
            .children
            .iter()
            .map(|name| Contact {
                name: name.clone(),
                relationship: "child".into(),
                notes: None,
            })
            .collect();

        RoomRoster::new(vec![
            participant(&self.sender, &self.sender_name),
            participant(&self.receiver, &self.receiver_name),
        ])
        .with_contacts(contacts)
    }

    /// Lines without an "identity:" prefix are attributed to the receiver.
    fn history(&self) -> Vec<Message> {
        self.history
            .iter()
            .map(|line| match line.split_once(':') {
                Some((who, text)) if !who.trim().is_empty() && !who.contains(' ') => {
                    Message::new(&self.room, who.trim(), text.trim())
                }
                _ => Message::new(&self.room, &self.receiver, line.trim()),
            })
            .collect()
    }
}

/// What the pipeline can tell without a model call.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalReport {
    pub prefilter: PrefilterVerdict,
    pub conflict_patterns: ConflictPatterns,
    pub red_flags: Vec<String>,
    pub intent: UserIntent,
    pub detector: DetectorReport,
}

pub fn local_report(args: &AnalyzeArgs) -> LocalReport {
    let roster = args.roster();
    let context = DetectorContext {
        child_names: roster.child_names(),
        sender_id: args.sender.clone(),
        receiver_id: args.receiver.clone(),
    };
    LocalReport {
        prefilter: classify(&args.text),
        conflict_patterns: detect_conflict_patterns(&args.text),
        red_flags: red_flags(&args.text),
        intent: infer_intent(&args.text),
        detector: RuleDetector::new().evaluate(&args.text, &context),
    }
}

pub async fn run(config_path: &Path, args: AnalyzeArgs) -> Result<()> {
    if args.dry_run {
        println!("{}", serde_json::to_string_pretty(&local_report(&args))?);
        return Ok(());
    }

    let config = MediatorConfig::load_with_env(config_path).map_err(config_error)?;
    let mediator = Mediator::connect(&config)?;

    let message = Message::new(&args.room, &args.sender, &args.text);
    let request = AnalysisRequest::new(message, args.roster()).with_history(args.history());

    match mediator.analyze(request).await {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(e) => {
            let body = serde_json::json!({
                "error": e.code(),
                "message": e.to_string(),
                "retryable": e.is_retryable(),
                "retryAfterSecs": e.retry_after_secs(),
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
            Err(e.into())
        }
    }
}
