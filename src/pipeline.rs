//! Contract Pipeline - Single Entry Point
//!
//! template check -> validation -> context -> render -> optional PDF.
//! Generation never writes a partial document, and a failed PDF conversion
//! never fails the generation.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::context::{build_context, ContractProfile, ContractRequest, MergeContext};
use crate::docx::{DocxTemplate, RenderError};
use crate::naming::artifact_base_name;
use crate::print::PrintConverter;
use crate::templates::TEMPLATE_FILENAME;
use crate::validation::Validator;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Template não encontrado. Coloque o arquivo {} na pasta Downloads.", TEMPLATE_FILENAME)]
    TemplateMissing(PathBuf),

    #[error("Campo obrigatório: {0}")]
    MissingField(String),

    #[error("Erro ao gerar contrato: {0}")]
    RenderFailure(String),
}

impl PipelineError {
    /// Errors caused by the caller or by setup the caller can fix.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::TemplateMissing(_) | Self::MissingField(_))
    }
}

impl From<RenderError> for PipelineError {
    fn from(err: RenderError) -> Self {
        Self::RenderFailure(err.to_string())
    }
}

/// Names of the artifacts written to the output directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GeneratedContract {
    pub docx_file: String,
    pub pdf_file: Option<String>,
}

pub struct ContractPipeline {
    template_path: PathBuf,
    output_dir: PathBuf,
    profile: ContractProfile,
    validator: Validator,
    converter: Arc<dyn PrintConverter>,
}

impl ContractPipeline {
    pub fn new(
        template_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        converter: Arc<dyn PrintConverter>,
    ) -> Self {
        Self {
            template_path: template_path.into(),
            output_dir: output_dir.into(),
            profile: ContractProfile::default(),
            validator: Validator::new(),
            converter,
        }
    }

    pub fn with_profile(mut self, profile: ContractProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn template_exists(&self) -> bool {
        self.template_path.is_file()
    }

    /// Validate the request and assemble its merge context.
    pub fn prepare_context(
        &self,
        request: &ContractRequest,
        now: NaiveDateTime,
    ) -> Result<MergeContext, PipelineError> {
        self.validator
            .validate(request)
            .map_err(|violation| PipelineError::MissingField(violation.field))?;
        Ok(build_context(request, &self.profile, now.date()))
    }

    pub async fn generate(&self, request: &ContractRequest) -> Result<GeneratedContract, PipelineError> {
        self.generate_at(request, Local::now().naive_local()).await
    }

    /// Run the whole pipeline with an explicit clock reading.
    pub async fn generate_at(
        &self,
        request: &ContractRequest,
        now: NaiveDateTime,
    ) -> Result<GeneratedContract, PipelineError> {
        if !self.template_exists() {
            return Err(PipelineError::TemplateMissing(self.template_path.clone()));
        }

        let context = self.prepare_context(request, now)?;

        let base_name = artifact_base_name(context.text("cliente_nome_completo"), now);
        let docx_file = format!("{base_name}.docx");
        let docx_path = self.output_dir.join(&docx_file);

        self.render(context, docx_path.clone()).await?;
        tracing::info!(file = %docx_file, "contract generated");

        let pdf_file = if request.flag("gerar_pdf", false) {
            self.converter
                .convert(&docx_path, &self.output_dir)
                .await
                .and_then(|pdf| pdf.file_name().map(|n| n.to_string_lossy().into_owned()))
        } else {
            None
        };

        if let Some(pdf) = &pdf_file {
            tracing::info!(file = %pdf, "print rendition generated");
        }

        Ok(GeneratedContract { docx_file, pdf_file })
    }

    async fn render(&self, context: MergeContext, dest: PathBuf) -> Result<(), PipelineError> {
        let template = self.template_path.clone();
        let rendered = tokio::task::spawn_blocking(move || -> Result<(), RenderError> {
            DocxTemplate::open(&template)?.render_to_file(context.as_map(), &dest)
        })
        .await
        .map_err(|e| PipelineError::RenderFailure(e.to_string()))?;

        rendered.map_err(|e| {
            tracing::error!(error = %e, "contract render failed");
            PipelineError::from(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::print::DisabledConverter;
    use chrono::NaiveDate;

    fn pipeline() -> ContractPipeline {
        ContractPipeline::new("uploads/missing.docx", "output", Arc::new(DisabledConverter))
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, 2)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_prepare_context_reports_missing_field() {
        let err = pipeline()
            .prepare_context(&ContractRequest::new(), now())
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingField(ref f) if f == "cliente_nome_completo"));
        assert_eq!(err.to_string(), "Campo obrigatório: cliente_nome_completo");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_prepare_context_uses_clock_date() {
        let request = ContractRequest::new()
            .with("cliente_nome_completo", "Maria")
            .with("cliente_cpf", "123")
            .with("data_inicio", "01/12/2025")
            .with("valor_total", "900");
        let context = pipeline().prepare_context(&request, now()).unwrap();
        assert_eq!(context.text("dia_assinatura"), "02");
        assert_eq!(context.text("mes_extenso_assinatura"), "novembro");
    }

    #[test]
    fn test_render_failure_is_server_error() {
        assert!(!PipelineError::RenderFailure("boom".into()).is_client_error());
    }

    #[tokio::test]
    async fn test_missing_template_checked_before_fields() {
        let err = pipeline().generate(&ContractRequest::new()).await.unwrap_err();
        assert!(matches!(err, PipelineError::TemplateMissing(_)));
        assert!(err.to_string().contains("contrato_base.docx"));
    }
}
