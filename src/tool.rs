//! Running a software tool against a class.
//!
//! A tool is an HTML snippet. Running it wraps the snippet in a standalone
//! document whose first script exposes the roster as `window.students`.

use serde::Serialize;
use uuid::Uuid;

use crate::model::{ClassData, Gender, SoftwareTool};

/// The roster entry shape visible to tool scripts.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolStudent<'a> {
    id: Uuid,
    first_name: &'a str,
    last_name: &'a str,
    gender: Gender,
}

/// Renders `tool` as a complete HTML document for `class`.
pub fn render_document(tool: &SoftwareTool, class: &ClassData) -> Result<String, serde_json::Error> {
    let students: Vec<_> = class
        .students
        .iter()
        .map(|s| ToolStudent {
            id: s.id,
            first_name: &s.first_name,
            last_name: &s.last_name,
            gender: s.gender,
        })
        .collect();
    let json = serde_json::to_string(&students)?;

    Ok(format!(
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
         <body><script>window.students = {json};</script>{content}</body></html>",
        title = escape_text(&tool.name),
        json = escape_script(&json),
        content = tool.content_html,
    ))
}

/// Keeps a JSON literal from closing its `<script>` element early.
fn escape_script(json: &str) -> String {
    json.replace("</", "<\\/")
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::StudentRecord;

    fn class_with(students: Vec<StudentRecord>) -> ClassData {
        let mut class = ClassData::new("2nde A", "abc").unwrap();
        class.add_students(students);
        class
    }

    #[test]
    fn injects_roster_before_content() {
        let tool = SoftwareTool::new("Tirage", "🎲", "<div id=\"app\"></div>".into()).unwrap();
        let student = StudentRecord::new("Jean", "Dupont", Gender::M).unwrap();
        let class = class_with(vec![student.clone()]);

        let doc = render_document(&tool, &class).unwrap();

        assert!(doc.starts_with("<!DOCTYPE html>"));
        let script = doc.find("window.students = [").unwrap();
        let content = doc.find("<div id=\"app\"></div>").unwrap();
        assert!(script < content);
        assert!(doc.contains(&format!("\"id\":\"{}\"", student.id)));
        assert!(doc.contains("\"firstName\":\"Jean\""));
        assert!(doc.contains("\"lastName\":\"Dupont\""));
        assert!(doc.contains("\"gender\":\"M\""));
    }

    #[test]
    fn empty_roster_is_an_empty_array() {
        let tool = SoftwareTool::new("Vide", "", String::new()).unwrap();
        let doc = render_document(&tool, &class_with(Vec::new())).unwrap();
        assert!(doc.contains("window.students = [];"));
    }

    #[test]
    fn student_names_cannot_close_the_script() {
        let tool = SoftwareTool::new("T", "", String::new()).unwrap();
        let student = StudentRecord::new("</script><b>", "X", Gender::F).unwrap();
        let doc = render_document(&tool, &class_with(vec![student])).unwrap();

        assert_eq!(doc.matches("</script>").count(), 1);
        assert!(doc.contains("<\\/script><b>"));
    }

    #[test]
    fn title_is_escaped() {
        let tool = SoftwareTool::new("A<B & C", "", String::new()).unwrap();
        let doc = render_document(&tool, &class_with(Vec::new())).unwrap();
        assert!(doc.contains("<title>A&lt;B &amp; C</title>"));
    }
}
