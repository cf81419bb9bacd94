//! Pipeline job `config.xml` rendering and reading.
//!
//! Only the elements this controller writes are read back. Jenkins may add
//! its own elements or reorder attributes; those are ignored.

use super::super::DevOpsError;
use crate::crd::{DiscarderProperty, NoScmPipeline, TimerTrigger};
use std::fmt::Write as _;

const DISABLE_CONCURRENT: &str = "org.jenkinsci.plugins.workflow.job.properties.DisableConcurrentBuildsJobProperty";
const TIMER_TRIGGER: &str = "hudson.triggers.TimerTrigger";

/// Canonical form used for comparisons: empty strings and empty discarders
/// mean "not set".
pub fn canonical(job: &NoScmPipeline) -> NoScmPipeline {
    let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
    NoScmPipeline {
        name: job.name.clone(),
        description: non_empty(&job.description),
        jenkinsfile: non_empty(&job.jenkinsfile),
        disable_concurrent: job.disable_concurrent,
        discarder: job
            .discarder
            .clone()
            .filter(|d| !d.days_to_keep.is_empty() || !d.num_to_keep.is_empty()),
        timer_trigger: job.timer_trigger.clone().filter(|t| !t.cron.is_empty()),
    }
}

pub fn render(job: &NoScmPipeline) -> String {
    let mut xml = String::from("<?xml version='1.1' encoding='UTF-8'?>\n");
    xml.push_str("<flow-definition plugin=\"workflow-job\">\n");
    let _ = writeln!(
        xml,
        "  <description>{}</description>",
        escape(job.description.as_deref().unwrap_or_default())
    );
    xml.push_str("  <keepDependencies>false</keepDependencies>\n");
    xml.push_str("  <properties>\n");
    if job.disable_concurrent {
        let _ = writeln!(xml, "    <{DISABLE_CONCURRENT}/>");
    }
    if let Some(discarder) = &job.discarder {
        xml.push_str("    <jenkins.model.BuildDiscarderProperty>\n");
        xml.push_str("      <strategy class=\"hudson.tasks.LogRotator\">\n");
        let _ = writeln!(
            xml,
            "        <daysToKeep>{}</daysToKeep>",
            escape(or_unset(&discarder.days_to_keep))
        );
        let _ = writeln!(
            xml,
            "        <numToKeep>{}</numToKeep>",
            escape(or_unset(&discarder.num_to_keep))
        );
        xml.push_str("        <artifactDaysToKeep>-1</artifactDaysToKeep>\n");
        xml.push_str("        <artifactNumToKeep>-1</artifactNumToKeep>\n");
        xml.push_str("      </strategy>\n");
        xml.push_str("    </jenkins.model.BuildDiscarderProperty>\n");
    }
    if let Some(trigger) = &job.timer_trigger {
        xml.push_str("    <org.jenkinsci.plugins.workflow.job.properties.PipelineTriggersJobProperty>\n");
        xml.push_str("      <triggers>\n");
        let _ = writeln!(
            xml,
            "        <{TIMER_TRIGGER}><spec>{}</spec></{TIMER_TRIGGER}>",
            escape(&trigger.cron)
        );
        xml.push_str("      </triggers>\n");
        xml.push_str("    </org.jenkinsci.plugins.workflow.job.properties.PipelineTriggersJobProperty>\n");
    }
    xml.push_str("  </properties>\n");
    xml.push_str(
        "  <definition class=\"org.jenkinsci.plugins.workflow.cps.CpsFlowDefinition\" plugin=\"workflow-cps\">\n",
    );
    let _ = writeln!(
        xml,
        "    <script>{}</script>",
        escape(job.jenkinsfile.as_deref().unwrap_or_default())
    );
    xml.push_str("    <sandbox>true</sandbox>\n");
    xml.push_str("  </definition>\n");
    xml.push_str("  <disabled>false</disabled>\n");
    xml.push_str("</flow-definition>\n");
    xml
}

/// Read a job definition back from `config.xml`. The result is canonical.
pub fn parse(name: &str, xml: &str) -> Result<NoScmPipeline, DevOpsError> {
    if !xml.contains("<flow-definition") {
        return Err(DevOpsError::MalformedConfig {
            name: name.to_string(),
            reason: "not a pipeline job".to_string(),
        });
    }

    let discarder = element(xml, "jenkins.model.BuildDiscarderProperty").map(|block| {
        let field = |tag: &str| {
            from_unset(element(block, tag).map(unescape).unwrap_or_default())
        };
        DiscarderProperty {
            days_to_keep: field("daysToKeep"),
            num_to_keep: field("numToKeep"),
        }
    });
    let timer_trigger = element(xml, TIMER_TRIGGER)
        .and_then(|block| element(block, "spec"))
        .map(|cron| TimerTrigger {
            cron: unescape(cron),
        });

    Ok(canonical(&NoScmPipeline {
        name: name.to_string(),
        description: element(xml, "description").map(unescape),
        jenkinsfile: element(xml, "script").map(unescape),
        disable_concurrent: xml.contains(&format!("<{DISABLE_CONCURRENT}")),
        discarder,
        timer_trigger,
    }))
}

// Jenkins stores "-1" for an unset LogRotator bound
fn or_unset(value: &str) -> &str {
    if value.is_empty() {
        "-1"
    } else {
        value
    }
}

fn from_unset(value: String) -> String {
    if value == "-1" {
        String::new()
    } else {
        value
    }
}

/// Inner text of the first `<tag>`; `Some("")` for `<tag/>`.
fn element<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}");
    let mut from = 0;
    while let Some(pos) = xml[from..].find(&open) {
        let start = from + pos + open.len();
        let rest = &xml[start..];
        // must be a full tag name, not a prefix of a longer one
        match rest.chars().next() {
            Some('>') => {
                let body = &rest[1..];
                let close = format!("</{tag}>");
                return body.find(&close).map(|end| &body[..end]);
            }
            Some('/') if rest.starts_with("/>") => return Some(""),
            Some(' ') => {
                let gt = rest.find('>')?;
                if rest[..gt].ends_with('/') {
                    return Some("");
                }
                let body = &rest[gt + 1..];
                let close = format!("</{tag}>");
                return body.find(&close).map(|end| &body[..end]);
            }
            _ => from = start,
        }
    }
    None
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = tail.find(';') else {
            out.push_str(tail);
            return out;
        };
        let entity = &tail[1..semi];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => entity
                .strip_prefix("#x")
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        match decoded {
            Some(c) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
