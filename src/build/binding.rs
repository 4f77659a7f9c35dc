//! JS binding entry and type definition files
//!
//! The binding entry is a small loader: it tries the `.node` file next to it
//! first (local development builds), then the platform package installed as
//! an optional dependency. Type definitions come from the addon's own
//! proc-macros; we only prefix the header.

use crate::core::target::TargetTriple;
use std::collections::BTreeMap;
use std::fmt::Write;

const BINDING_HEADER: &str = "// auto-generated by cargo-addon\n/* eslint-disable */\n";

/// Render the binding entry for `targets`
///
/// An empty target list means a non-platform build: the loader requires
/// `./<binary>.node` directly.
pub fn render_binding(binary_name: &str, package_prefix: &str, targets: &[TargetTriple], esm: bool) -> String {
  let mut out = String::from(BINDING_HEADER);
  if esm {
    out.push_str("import { createRequire } from 'node:module'\n\n");
    out.push_str("const require = createRequire(import.meta.url)\n");
  }
  out.push('\n');

  if targets.is_empty() {
    let _ = writeln!(out, "const binding = require('./{}.node')", binary_name);
  } else {
    render_loader(&mut out, binary_name, package_prefix, targets);
  }

  out.push('\n');
  if esm {
    out.push_str("export default binding\n");
  } else {
    out.push_str("module.exports = binding\n");
  }
  out
}

fn render_loader(out: &mut String, binary_name: &str, package_prefix: &str, targets: &[TargetTriple]) {
  // `process.platform-process.arch` -> candidate suffixes, in target order
  let mut candidates: BTreeMap<String, Vec<String>> = BTreeMap::new();
  for target in targets {
    candidates
      .entry(format!("{}-{}", target.platform, target.arch))
      .or_default()
      .push(target.platform_arch_abi());
  }

  out.push_str("const { platform, arch } = process\n\n");
  out.push_str("const candidates = {\n");
  for (key, suffixes) in &candidates {
    let list: Vec<String> = suffixes.iter().map(|s| format!("'{}'", s)).collect();
    let _ = writeln!(out, "  '{}': [{}],", key, list.join(", "));
  }
  out.push_str("}\n\n");

  out.push_str(
    r#"function isMusl() {
  if (platform !== 'linux') return false
  try {
    return !process.report.getReport().header.glibcVersionRuntime
  } catch {
    return true
  }
}

function loadBinding() {
  const musl = isMusl()
  const suffixes = (candidates[`${platform}-${arch}`] || []).filter((suffix) => {
    if (suffix.endsWith('-musl')) return musl
    if (suffix.endsWith('-gnu')) return !musl
    return true
  })
  const errors = []
  for (const suffix of suffixes) {
"#,
  );
  let _ = writeln!(
    out,
    "    for (const id of [`./{}.${{suffix}}.node`, `{}-${{suffix}}`]) {{",
    binary_name, package_prefix
  );
  out.push_str(
    r#"      try {
        return require(id)
      } catch (err) {
        errors.push(err)
      }
    }
  }
  throw new Error(`Failed to load native binding for ${platform}-${arch}`, { cause: errors })
}

const binding = loadBinding()
"#,
  );
}

/// Header-prefixed type definitions
pub fn render_dts(header: &str, type_defs: &str, const_enum: bool) -> String {
  let mut out = String::from(header);
  if !header.is_empty() {
    out.push('\n');
  }
  if const_enum {
    out.push_str(type_defs);
  } else {
    out.push_str(&type_defs.replace("export const enum ", "export enum "));
  }
  if !out.ends_with('\n') {
    out.push('\n');
  }
  out
}
