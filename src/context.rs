//! Contract Data Model - Request In, Merge Context Out
//!
//! A request is a loose JSON object. The merge context is what the template
//! sees: trimmed request fields, the formatted amount, the contractor's fixed
//! identity, and the signature date.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::currency::format_currency;

/// Month names indexed by month number; index 0 is unused.
pub const MONTHS_PT: [&str; 13] = [
    "", "janeiro", "fevereiro", "março", "abril", "maio", "junho",
    "julho", "agosto", "setembro", "outubro", "novembro", "dezembro",
];

/// Free-text fields copied into the context after trimming. Missing keys
/// become empty strings.
pub const TEXT_FIELDS: [&str; 24] = [
    // Contratante
    "cliente_nome_completo",
    "cliente_estado_civil",
    "cliente_cpf",
    "cliente_rg",
    "cliente_email",
    "cliente_telefone",
    "cliente_logradouro",
    "cliente_numero",
    "cliente_complemento",
    "cliente_bairro",
    "cliente_cidade",
    "cliente_uf",
    "cliente_cep",
    // Serviço
    "data_inicio",
    "data_fim",
    "horario_inicio",
    "horario_fim",
    // Financeiro
    "dia_vencimento",
    "chave_pix",
    // Assinatura
    "dia_assinatura",
    "mes_extenso_assinatura",
    "ano_assinatura",
    // Testemunhas
    "testemunha_1_cpf",
    "testemunha_2_cpf",
];

/// Caller-supplied contract data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractRequest {
    fields: Map<String, Value>,
}

impl ContractRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// True when the key is present with a truthy value.
    pub fn has_value(&self, key: &str) -> bool {
        self.get(key).map_or(false, is_truthy)
    }

    /// Trimmed text for `key`, or `default` when the key is absent.
    pub fn text_or(&self, key: &str, default: &str) -> String {
        match self.get(key) {
            Some(value) => value_text(value).trim().to_string(),
            None => default.to_string(),
        }
    }

    /// Boolean option; absent keys take `default`, present ones their truthiness.
    pub fn flag(&self, key: &str, default: bool) -> bool {
        self.get(key).map_or(default, is_truthy)
    }
}

/// Identity of the contracting organization. Never taken from a request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrganizationConstants {
    pub contratado_cnpj: String,
    pub representante_contratado_nome: String,
    pub representante_contratado_cpf: String,
}

impl OrganizationConstants {
    pub fn wolve() -> Self {
        Self {
            contratado_cnpj: "52.183.690/0001-65".to_string(),
            representante_contratado_nome: "LUCIANO MERCI MENDES".to_string(),
            representante_contratado_cpf: "024.866.980-00".to_string(),
        }
    }

    fn entries(&self) -> [(&'static str, &str); 3] {
        [
            ("contratado_cnpj", &self.contratado_cnpj),
            ("representante_contratado_nome", &self.representante_contratado_nome),
            ("representante_contratado_cpf", &self.representante_contratado_cpf),
        ]
    }
}

impl Default for OrganizationConstants {
    fn default() -> Self {
        Self::wolve()
    }
}

/// Everything about context assembly that is fixed per deployment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContractProfile {
    pub organization: OrganizationConstants,
    /// Used for `foro_cidade` / `cidade_assinatura` when the key is absent.
    pub default_city: String,
    /// Used for `foro_uf` / `uf_assinatura` when the key is absent.
    pub default_uf: String,
}

impl Default for ContractProfile {
    fn default() -> Self {
        Self {
            organization: OrganizationConstants::wolve(),
            default_city: "Santa Maria".to_string(),
            default_uf: "RS".to_string(),
        }
    }
}

/// The resolved key/value set handed to the renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MergeContext(Map<String, Value>);

impl MergeContext {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value for `key`; empty when absent or not a string.
    pub fn text(&self, key: &str) -> &str {
        self.get(key).and_then(Value::as_str).unwrap_or_default()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Assemble the merge context. Assumes required fields were already checked.
pub fn build_context(
    request: &ContractRequest,
    profile: &ContractProfile,
    today: NaiveDate,
) -> MergeContext {
    let mut context = MergeContext::default();

    for field in TEXT_FIELDS {
        context.insert(field, request.text_or(field, ""));
    }
    for (field, default) in [
        ("foro_cidade", &profile.default_city),
        ("foro_uf", &profile.default_uf),
        ("cidade_assinatura", &profile.default_city),
        ("uf_assinatura", &profile.default_uf),
    ] {
        context.insert(field, request.text_or(field, default));
    }

    let postos = match request.get("postos") {
        None | Some(Value::Null) => Value::Array(vec![]),
        Some(value) => value.clone(),
    };
    context.insert("postos", postos);

    let valor = request.get("valor_total").map(value_text).unwrap_or_default();
    context.insert("valor_total", format_currency(&valor));

    // Inserted last so request keys with the same names never win.
    for (key, value) in profile.organization.entries() {
        context.insert(key, value);
    }

    let complemento = context.text("cliente_complemento").to_string();
    if !complemento.is_empty() {
        context.insert("cliente_complemento", format!(", {complemento}"));
    }

    if request.flag("usar_data_hoje", true) {
        apply_signature_date(&mut context, today);
    }

    context
}

fn apply_signature_date(context: &mut MergeContext, date: NaiveDate) {
    context.insert("dia_assinatura", format!("{:02}", date.day()));
    context.insert("mes_extenso_assinatura", MONTHS_PT[date.month() as usize]);
    context.insert("ano_assinatura", date.year().to_string());
}

/// Truthiness used for flags, required fields and template conditions.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Text form of a JSON value as it appears in a document.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
