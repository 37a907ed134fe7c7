//! Render planned files from templates into a project directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use minijinja::{AutoEscape, Environment, UndefinedBehavior, Value, context};
use tracing::{debug, info, instrument, warn};

use crate::core::outcome::GenerationReport;
use crate::core::planner::Plan;
use crate::core::resolve::{find_template_marker, resolve_template};
use crate::io::templates::FsTemplateSource;

/// Output of a generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedProject {
    pub project_dir: PathBuf,
    pub report: GenerationReport,
    /// One line per skipped file, suitable for job notes.
    pub warnings: Vec<String>,
}

/// MiniJinja environment configured for source-code output.
pub struct Renderer {
    env: Environment<'static>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_auto_escape_callback(|_| AutoEscape::None);
        env.add_filter("pystr", py_str);
        Self { env }
    }

    pub fn render(&self, name: &str, source: &str, ctx: &Value) -> Result<String> {
        self.env
            .render_named_str(name, source, ctx)
            .with_context(|| format!("render template {name}"))
    }
}

/// Quote `value` as a double-quoted Python string literal.
pub fn py_str(value: String) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Fixed rendering context shared by every template of one plan.
pub fn template_context(plan: &Plan) -> Value {
    let spec = &plan.spec;
    context! {
        spec => spec,
        plan => plan,
        platform => spec.platform.as_str(),
        bot_name => &spec.name,
        description => &spec.description,
        features => &spec.features,
        env_vars => &spec.env_vars,
        dependencies => &plan.dependencies,
        logging_level => spec.logging_level.as_str(),
        include_docker => spec.include_docker,
        include_ci => spec.include_ci,
        include_tests => spec.include_tests,
    }
}

/// Render every planned file into `{output_root}/{bot name}`.
///
/// A directory left there by an earlier job is removed first, so the project
/// holds only this plan's files. Files with no template are skipped and
/// reported. A render error or leftover template syntax in the output is an
/// error.
#[instrument(skip_all, fields(bot = %plan.spec.name, planned = plan.files.len()))]
pub fn generate_project(
    plan: &Plan,
    templates: &FsTemplateSource,
    output_root: &Path,
) -> Result<GeneratedProject> {
    let project_dir = output_root.join(&plan.spec.name);
    if project_dir.exists() {
        info!(project_dir = %project_dir.display(), "replacing previous output");
        fs::remove_dir_all(&project_dir)
            .with_context(|| format!("clear project dir {}", project_dir.display()))?;
    }
    fs::create_dir_all(&project_dir)
        .with_context(|| format!("create project dir {}", project_dir.display()))?;

    let renderer = Renderer::new();
    let ctx = template_context(plan);
    let platform = plan.spec.platform;
    let mut report = GenerationReport::default();
    let mut warnings = Vec::new();

    for rel in &plan.files {
        let Some(name) = resolve_template(templates, platform, rel) else {
            warn!(file = %rel, %platform, "no template found, skipping");
            warnings.push(format!("Template not found for {rel}, skipped"));
            report.skipped.push(rel.clone());
            continue;
        };
        let source = templates.load(&name)?;
        let rendered = renderer.render(&name, &source, &ctx)?;
        if let Some(marker) = find_template_marker(&rendered) {
            bail!("rendered {rel} from {name} still contains template marker {marker:?}");
        }
        write_output(&project_dir, rel, &rendered)?;
        debug!(file = %rel, template = %name, bytes = rendered.len(), "rendered");
        report.rendered += 1;
    }

    info!(
        project_dir = %project_dir.display(),
        rendered = report.rendered,
        skipped = report.skipped.len(),
        "generation finished"
    );
    Ok(GeneratedProject {
        project_dir,
        report,
        warnings,
    })
}

fn write_output(project_dir: &Path, rel: &str, contents: &str) -> Result<()> {
    let path = project_dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }
    fs::write(&path, contents.as_bytes()).with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::planner::build_plan;
    use crate::core::spec::{BotSpec, BotSpecInput, EnvVarSpec, Platform};

    fn plan(platform: Platform) -> Plan {
        let mut input = BotSpecInput::new("Gen Bot", platform, "generates things");
        input.env_vars = vec![EnvVarSpec::new("API_KEY", "service key")];
        build_plan(&BotSpec::try_from(input).expect("valid spec"))
    }

    fn write_template(root: &Path, name: &str, body: &str) {
        let path = root.join(name);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(path, body).expect("write template");
    }

    #[test]
    fn context_exposes_every_key() {
        let renderer = Renderer::new();
        let ctx = template_context(&plan(Platform::Cli));
        let out = renderer
            .render(
                "probe",
                "{{ platform }}|{{ bot_name }}|{{ description }}|{{ features|join(',') }}|\
                 {{ env_vars[0].name }}|{{ dependencies[0] }}|{{ logging_level }}|\
                 {{ include_docker }}{{ include_ci }}{{ include_tests }}|{{ spec.name }}|{{ plan.files|length }}",
                &ctx,
            )
            .expect("render");
        assert_eq!(
            out,
            "cli|gen-bot|generates things|echo|API_KEY|click>=8.1.7|INFO|TrueTrueTrue|gen-bot|15"
        );
    }

    #[test]
    fn pystr_quotes_for_python() {
        assert_eq!(py_str("plain".to_string()), r#""plain""#);
        assert_eq!(py_str(r#"say "hi"\n"#.to_string()), r#""say \"hi\"\\n""#);
        assert_eq!(py_str("a\nb".to_string()), r#""a\nb""#);

        let renderer = Renderer::new();
        let out = renderer
            .render("probe", "X = {{ description | pystr }}", &template_context(&plan(Platform::Cli)))
            .expect("render");
        assert_eq!(out, r#"X = "generates things""#);
    }

    #[test]
    fn missing_templates_are_skipped_not_fatal() {
        let temp = tempfile::tempdir().expect("tempdir");
        let templates = temp.path().join("templates");
        write_template(&templates, "common/README.md.j2", "# {{ bot_name }}\n");
        write_template(&templates, "cli/main.py.j2", "print('{{ bot_name }}')\n");

        let out = temp.path().join("out");
        let project =
            generate_project(&plan(Platform::Cli), &FsTemplateSource::new(&templates), &out)
                .expect("generate");

        assert_eq!(project.project_dir, out.join("gen-bot"));
        assert_eq!(project.report.rendered, 2);
        assert_eq!(project.report.planned(), 15);
        assert_eq!(project.warnings.len(), 13);
        assert!(project.report.skipped.contains(&"config.py".to_string()));
        assert_eq!(
            fs::read_to_string(project.project_dir.join("main.py")).expect("read"),
            "print('gen-bot')\n"
        );
        assert!(!project.project_dir.join("config.py").exists());
    }

    #[test]
    fn earlier_output_for_the_same_bot_is_replaced() {
        let temp = tempfile::tempdir().expect("tempdir");
        let templates = temp.path().join("templates");
        write_template(&templates, "common/README.md.j2", "# {{ bot_name }}\n");
        let out = temp.path().join("out");
        let stale = out.join("gen-bot").join("Dockerfile");
        fs::create_dir_all(stale.parent().expect("parent")).expect("mkdir");
        fs::write(&stale, "FROM old\n").expect("write stale");

        let project =
            generate_project(&plan(Platform::Cli), &FsTemplateSource::new(&templates), &out)
                .expect("generate");

        assert!(!stale.exists());
        assert!(project.project_dir.join("README.md").is_file());
    }

    #[test]
    fn leftover_markers_fail_generation() {
        let temp = tempfile::tempdir().expect("tempdir");
        let templates = temp.path().join("templates");
        write_template(&templates, "README.md.j2", "{{ '{{' }} raw\n");

        let err = generate_project(
            &plan(Platform::Cli),
            &FsTemplateSource::new(&templates),
            &temp.path().join("out"),
        )
        .expect_err("marker must fail");
        assert!(format!("{err:#}").contains("template marker"));
    }

    #[test]
    fn undefined_variables_fail_generation() {
        let temp = tempfile::tempdir().expect("tempdir");
        let templates = temp.path().join("templates");
        write_template(&templates, "README.md.j2", "{{ not_a_key }}\n");
        assert!(
            generate_project(
                &plan(Platform::Cli),
                &FsTemplateSource::new(&templates),
                &temp.path().join("out"),
            )
            .is_err()
        );
    }
}
