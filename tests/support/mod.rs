//! Shared fixtures: a small contract template and request builders.

#![allow(dead_code)]

use contratos_core::ContractRequest;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Template body touching every field the assertions look at.
pub const CONTRACT_BODY: &str = concat!(
    "<w:p><w:r><w:t>CONTRATANTE: {{ cliente_nome_completo }}, CPF {{ cliente_cpf }}</w:t></w:r></w:p>",
    "<w:p><w:r><w:t>Endereço: {{ cliente_logradouro }} {{ cliente_numero }}{{ cliente_complemento }}</w:t></w:r></w:p>",
    "<w:p><w:r><w:t>CONTRATADA: CNPJ {{ contratado_cnpj }}, {{ representante_contratado_nome }}</w:t></w:r></w:p>",
    "<w:p><w:r><w:t>Valor: R$ {{ valor_total }}</w:t></w:r></w:p>",
    "<w:p><w:r><w:t>{% for p in postos %}[{{ loop.index }}: {{ p.local }}]{% endfor %}</w:t></w:r></w:p>",
    "<w:p><w:r><w:t>Foro: {{ foro_cidade }}/{{ foro_uf }}</w:t></w:r></w:p>",
    "<w:p><w:r><w:t>{{ cidade_assinatura }}, {{ dia_assinatura }} de {{ mes_extenso_assinatura }} de {{ ano_assinatura }}</w:t></w:r></w:p>",
);

pub fn build_docx(body: &str) -> Vec<u8> {
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    writer.start_file("[Content_Types].xml", options).unwrap();
    writer.write_all(b"<Types/>").unwrap();
    writer.start_file("word/document.xml", options).unwrap();
    writer.write_all(document.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

pub fn write_template(path: &Path, body: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, build_docx(body)).unwrap();
}

/// Text of `word/document.xml` inside a generated file.
pub fn read_document(path: &Path) -> String {
    let bytes = fs::read(path).unwrap();
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut entry = archive.by_name("word/document.xml").unwrap();
    let mut out = String::new();
    entry.read_to_string(&mut out).unwrap();
    out
}

pub fn minimal_request() -> ContractRequest {
    ContractRequest::new()
        .with("cliente_nome_completo", "Maria Souza")
        .with("cliente_cpf", "123.456.789-00")
        .with("data_inicio", "01/04/2025")
        .with("valor_total", "1500")
}

pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
