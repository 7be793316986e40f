// src/app/workflow.rs
use crate::cert::{
    ca::{generate_root_ca, remove_ca_files, validate_existing_ca},
    error::IssueError,
    openssl::OpenSslTool,
    types::{CaRecord, LeafRequest, OutputArtifacts},
    verification::{inspect_certificate, inspect_private_key},
    CertificateOperations,
};
use crate::config::IssuerConfig;
use crate::ui::{
    collector::{self, CaChoice},
    render_report, IssuanceReport, Prompter,
};
use crate::utils::logging::Logger;
use std::{
    fmt,
    io::{BufRead, Write},
    path::PathBuf,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStep {
    Preflight,
    CollectCaChoice,
    GenerateCa,
    ValidateExistingCa,
    CollectPurpose,
    CollectSubjectAndSans,
    CollectValidity,
    GenerateKey,
    GenerateCsr,
    RenderPolicy,
    Sign,
    Verify,
    Report,
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug)]
pub struct IssueOutcome {
    pub ca: CaRecord,
    pub request: LeafRequest,
    pub artifacts: OutputArtifacts,
}

/// One interactive issuance, from CA selection to the final report.
pub struct IssuanceWorkflow<'a, R, W> {
    config: &'a IssuerConfig,
    tool: OpenSslTool,
    prompter: Prompter<R, W>,
    logger: &'a mut dyn Logger,
    step: WorkflowStep,
    history: Vec<WorkflowStep>,
}

impl<'a, R: BufRead, W: Write> IssuanceWorkflow<'a, R, W> {
    pub fn new(config: &'a IssuerConfig, prompter: Prompter<R, W>, logger: &'a mut dyn Logger) -> Self {
        Self {
            config,
            tool: OpenSslTool::new(config.openssl_program()),
            prompter,
            logger,
            step: WorkflowStep::Preflight,
            history: Vec::new(),
        }
    }

    pub fn step(&self) -> WorkflowStep {
        self.step
    }

    pub fn history(&self) -> &[WorkflowStep] {
        &self.history
    }

    pub fn into_prompter(self) -> Prompter<R, W> {
        self.prompter
    }

    fn enter(&mut self, step: WorkflowStep) {
        self.step = step;
        self.history.push(step);
        self.logger.debug_log(&format!("Entering step {}", step));
    }

    /// Runs every step; on failure the error is logged with the step it
    /// happened in and returned unchanged.
    pub fn run(&mut self) -> Result<IssueOutcome, IssueError> {
        let result = self.run_steps();
        if let Err(e) = &result {
            self.logger
                .log(&format!("Aborted during {}: {}", self.step, e));
            if let IssueError::ToolInvocation { source, .. } = e {
                if !source.stderr.trim().is_empty() {
                    self.logger.log(&format!("openssl: {}", source.stderr.trim()));
                }
            }
        }
        result
    }

    fn run_steps(&mut self) -> Result<IssueOutcome, IssueError> {
        self.enter(WorkflowStep::Preflight);
        let version = self.tool.probe(self.logger)?;
        self.logger.debug_log(&format!("Using {}", version));

        self.enter(WorkflowStep::CollectCaChoice);
        let ca = match collector::collect_ca_choice(&mut self.prompter)? {
            CaChoice::GenerateNew => {
                let (subject, prefix) =
                    collector::collect_ca_subject(&mut self.prompter, &self.config.ca)?;
                self.enter(WorkflowStep::GenerateCa);
                // Anything still at the prefix was confirmed for replacement.
                remove_ca_files(&CaRecord::from_prefix(&prefix), self.logger)?;
                generate_root_ca(&self.tool, &subject, &prefix, self.logger)?
            }
            CaChoice::UseExisting => {
                let record = collector::collect_existing_ca(&mut self.prompter, &PathBuf::from("."))?;
                self.enter(WorkflowStep::ValidateExistingCa);
                // Files can vanish between the prompt and here.
                validate_existing_ca(&record.certificate, &record.private_key, &record.serial)?
            }
        };
        self.logger
            .log(&format!("Using CA {}", ca.certificate.display()));

        self.enter(WorkflowStep::CollectPurpose);
        let (purpose, client) = collector::collect_purpose(&mut self.prompter)?;

        self.enter(WorkflowStep::CollectSubjectAndSans);
        let details = collector::collect_subject_and_sans(
            &mut self.prompter,
            purpose,
            client,
            &self.config.leaf,
        )?;

        self.enter(WorkflowStep::CollectValidity);
        let validity = collector::collect_validity(&mut self.prompter, &self.config.leaf)?;
        let request = collector::build_request(purpose, client, details, validity, &self.config.leaf);
        self.logger.log(&format!(
            "Issuing {:?} certificate for '{}' ({} days, {})",
            request.purpose, request.common_name, request.validity_days, request.key_algorithm
        ));

        let tool = self.tool.clone();
        let ops = CertificateOperations::new(&tool, &ca);
        ops.clear_previous_artifacts(&request.artifacts(), self.logger)?;

        self.enter(WorkflowStep::GenerateKey);
        ops.generate_key(&request, self.logger)?;

        self.enter(WorkflowStep::GenerateCsr);
        ops.generate_csr(&request, self.logger)?;

        self.enter(WorkflowStep::RenderPolicy);
        let policy = ops.render_policy(&request, self.logger)?;

        self.enter(WorkflowStep::Sign);
        let artifacts = ops.sign(&request, &policy, self.logger)?;
        drop(policy);

        self.enter(WorkflowStep::Verify);
        let verification = ops.verify(&artifacts, self.logger);
        let summary = match inspect_certificate(&artifacts.certificate) {
            Ok(summary) => Some(summary),
            Err(e) => {
                self.logger.warn(&format!("Could not parse issued certificate: {}", e));
                None
            }
        };
        let key_algorithm = inspect_private_key(&artifacts.private_key).ok().flatten();

        self.enter(WorkflowStep::Report);
        let report = render_report(&IssuanceReport {
            ca: &ca,
            artifacts: &artifacts,
            summary: summary.as_ref(),
            key_algorithm,
            verification: verification.as_ref().map(|_| ()).map_err(|e| e.to_string()),
        });
        self.prompter.say(&report)?;
        verification?;

        self.logger.log(&format!(
            "Issued {}",
            artifacts.certificate.display()
        ));
        Ok(IssueOutcome {
            ca,
            request,
            artifacts,
        })
    }
}
