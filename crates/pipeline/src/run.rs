use std::sync::Arc;

use tracing::{info, warn};

use {
    zapgate_identity::IdentityLinker,
    zapgate_mcp::ToolCaller,
};

use crate::extract::{code_from_changes, deployment_url};

/// Pipeline stage, in order. Logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Resolving,
    Generating,
    Extracting,
    Deploying,
    Done,
    Failed,
}

/// One pipeline execution. Ephemeral; exists for logging and tests.
#[derive(Debug)]
pub struct PipelineRun {
    pub prompt: String,
    pub tenant_id: Option<String>,
    pub generated_code: Option<String>,
    pub deployment_url: Option<String>,
    pub stage: Stage,
    pub error: Option<String>,
    /// The text handed back to the user, success or not.
    pub reply: String,
}

impl PipelineRun {
    fn started(prompt: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            tenant_id: None,
            generated_code: None,
            deployment_url: None,
            stage: Stage::Resolving,
            error: None,
            reply: String::new(),
        }
    }

    fn fail(mut self, stage: Stage, error: impl Into<String>, reply: impl Into<String>) -> Self {
        let error = error.into();
        warn!(stage = ?stage, error = %error, "pipeline failed");
        self.stage = Stage::Failed;
        self.error = Some(error);
        self.reply = reply.into();
        self
    }

    fn advance(&mut self, stage: Stage) {
        info!(from = ?self.stage, to = ?stage, "pipeline stage");
        self.stage = stage;
    }
}

pub const MSG_AUTH_REQUIRED: &str =
    "Please authenticate first: send /login to link your account.";
pub const MSG_NO_CODE: &str =
    "I couldn't extract any code from the generator output. Try rephrasing your request.";
pub const MSG_GENERATOR_DOWN: &str =
    "The code generator is unavailable right now. Please try again in a moment.";
pub const MSG_DEPLOYER_DOWN: &str =
    "Deployment is unavailable right now. Please try again in a moment.";

/// Composes the tool session and the identity linker into the
/// generate-and-deploy flow.
pub struct GenerateAndDeployPipeline {
    tools: Arc<dyn ToolCaller>,
    identity: Arc<IdentityLinker>,
}

impl GenerateAndDeployPipeline {
    #[must_use]
    pub fn new(tools: Arc<dyn ToolCaller>, identity: Arc<IdentityLinker>) -> Self {
        Self { tools, identity }
    }

    /// Run the pipeline and return the user-facing reply text.
    pub async fn run(&self, prompt: &str, external_chat_id: &str) -> String {
        self.run_detailed(prompt, external_chat_id).await.reply
    }

    /// Like [`run`](Self::run) but returns the full run record.
    pub async fn run_detailed(&self, prompt: &str, external_chat_id: &str) -> PipelineRun {
        let mut run = PipelineRun::started(prompt);

        // Resolve. No tool is called without a tenant to attribute it to.
        let tenant_id = match self.identity.resolve_tenant_id(external_chat_id).await {
            Ok(id) => id,
            Err(e) => return run.fail(Stage::Resolving, e.to_string(), MSG_AUTH_REQUIRED),
        };
        run.tenant_id = Some(tenant_id.clone());
        run.advance(Stage::Generating);

        let generated = match self
            .tools
            .invoke(
                "agentic_structured",
                serde_json::json!({
                    "prompt": prompt,
                    "actionType": "GERAR",
                    "tenantId": tenant_id,
                }),
            )
            .await
        {
            Ok(text) => text,
            Err(e) => return run.fail(Stage::Generating, e.to_string(), MSG_GENERATOR_DOWN),
        };
        run.advance(Stage::Extracting);

        let code = match code_from_changes(&generated) {
            Some(code) => code,
            None => {
                return run.fail(
                    Stage::Extracting,
                    "no usable code in generator output",
                    MSG_NO_CODE,
                );
            },
        };
        run.generated_code = Some(code.clone());
        run.advance(Stage::Deploying);

        let deploy_output = match self
            .tools
            .invoke("code_deploy", serde_json::json!({ "reactCode": code }))
            .await
        {
            Ok(text) => text,
            Err(e) => return run.fail(Stage::Deploying, e.to_string(), MSG_DEPLOYER_DOWN),
        };

        run.advance(Stage::Done);
        match deployment_url(&deploy_output) {
            Some(url) => {
                info!(url = %url, "deployment complete");
                run.deployment_url = Some(url.clone());
                run.reply = format!("Deployed: {url}");
            },
            None => {
                // Better a raw diagnostic than silence.
                warn!("deploy output had no recognizable URL, returning it verbatim");
                run.reply = deploy_output;
            },
        }
        run
    }
}
