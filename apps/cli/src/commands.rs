//! Command handlers.
//!
//! Handlers write results to `out` and per-frame failures to `err`, and return
//! whether every frame was accepted. Errors that stop a command (unreadable schema,
//! unknown model, I/O) are returned instead.

use anyhow::{Context, Result, bail};
use microdantic::{FrameBuffer, Instance, Model, ModelError, OrderedMap, Registry, SchemaDocument, Target, Value};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{debug, info, warn};

const READ_CHUNK: usize = 4096;

/// What to do with every decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAction {
    Render,
    Hash,
}

/// Reads a schema document and registers it into a fresh registry.
pub fn load_registry(schema: &Path) -> Result<Registry> {
    let text = fs::read_to_string(schema).with_context(|| format!("Failed to read {}", schema.display()))?;
    let document = if schema.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
        SchemaDocument::from_json_str(&text)
    } else {
        SchemaDocument::from_toml_str(&text)
    }
    .with_context(|| format!("Invalid schema document {}", schema.display()))?;

    let mut registry = Registry::new();
    let models = document
        .register_into(&mut registry)
        .with_context(|| format!("Failed to register {}", schema.display()))?;
    info!(schema = %schema.display(), models = models.len(), "Schema registered");
    Ok(registry)
}

/// Describes every registered model.
pub fn check(registry: &Registry, out: &mut impl Write) -> Result<()> {
    for model in registry.iter() {
        describe(model, out)?;
    }
    Ok(())
}

fn describe(model: &Model, out: &mut impl Write) -> Result<()> {
    let tagging = if model.serialize_name() { "tagged" } else { "untagged" };
    writeln!(out, "model {} ({tagging})", model.name())?;

    for field in model.fields() {
        let presence = match (field.default(), field.is_required()) {
            (Some(default), _) => format!(" = {default}"),
            (None, true) => " [required]".to_owned(),
            (None, false) => " [optional]".to_owned(),
        };
        let discriminator = field.discriminator().map(|d| format!(" by `{d}`")).unwrap_or_default();
        writeln!(out, "  {}: {}{presence}{discriminator}", field.name(), field.field_type())?;
    }

    let signature = model.signature();
    let literals: Vec<_> = signature.literals().map(|(name, _)| name).collect();
    let required: Vec<_> = signature.required().collect();
    writeln!(out, "  signature: literals [{}], required [{}]", literals.join(", "), required.join(", "))?;
    Ok(())
}

/// Decodes every frame read from `input`, writing renderings or hashes to `out` and
/// failures to `err`.
///
/// Returns `Ok(false)` when at least one frame failed.
pub fn process_frames(
    registry: &Registry,
    model: Option<&str>,
    frame_limit: usize,
    action: FrameAction,
    mut input: impl Read,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<bool> {
    let target = match model {
        Some(name) => Target::Concrete(registry.model(name)?),
        None => Target::Family,
    };

    let mut buffer = FrameBuffer::with_limit(frame_limit);
    let mut chunk = [0_u8; READ_CHUNK];
    let mut line = 0_usize;
    let mut failed = 0_usize;

    loop {
        let read = input.read(&mut chunk).context("Failed to read input")?;
        if read == 0 {
            break;
        }
        buffer.push(&chunk[..read]);

        loop {
            match buffer.next_frame() {
                Ok(Some(frame)) => {
                    line += 1;
                    match registry.from_framed_bytes(&frame, target) {
                        Ok(instance) => emit(&instance, action, out)?,
                        Err(error) => {
                            failed += 1;
                            report(line, &error, err)?;
                        },
                    }
                },
                Ok(None) => break,
                Err(error) => {
                    line += 1;
                    failed += 1;
                    report(line, &error, err)?;
                },
            }
        }
    }

    if let Err(error) = buffer.finish() {
        failed += 1;
        report(line + 1, &error, err)?;
    }

    debug!(frames = line, failed, "Input exhausted");
    Ok(failed == 0)
}

fn emit(instance: &Instance, action: FrameAction, out: &mut impl Write) -> Result<()> {
    match action {
        FrameAction::Render => writeln!(out, "{instance}")?,
        FrameAction::Hash => writeln!(out, "{:#010x}", instance.content_hash())?,
    }
    Ok(())
}

fn report(line: usize, error: &ModelError, err: &mut impl Write) -> Result<()> {
    warn!(line, kind = error.kind(), "Frame rejected");
    writeln!(err, "frame {line}: {error}")?;
    Ok(())
}

/// Builds an instance of `model` from `name=json` assignments and writes its frame.
///
/// Values are decoded like the text form, so nested models are JSON objects and
/// bytes are base64 strings. Fields that are not assigned take their defaults.
pub fn encode(registry: &Registry, model: &str, assignments: &[(String, String)], out: &mut impl Write) -> Result<()> {
    let model = registry.model(model)?;

    let mut payload = OrderedMap::with_capacity(assignments.len());
    for (name, raw) in assignments {
        if model.field(name).is_none() {
            bail!("Model `{}` has no field `{name}`", model.name());
        }
        let value: Value =
            serde_json::from_str(raw).with_context(|| format!("Value for `{name}` is not valid JSON: {raw}"))?;
        payload.insert(name.as_str(), value);
    }

    let instance = registry.from_ordered_map(payload, Target::from(model))?;
    out.write_all(&instance.to_framed_bytes()?)?;
    Ok(())
}
