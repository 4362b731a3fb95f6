//! `${name}` substitution for locators, literal strings and patterns

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("Unterminated '${{' in template '{template}'")]
    Unterminated { template: String },

    #[error("Unknown variable '{name}' in template '{template}'")]
    UnknownVariable { name: String, template: String },
}

/// Names referenced by a template, in order of appearance
pub fn variables(template: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                names.push(after[..end].trim().to_string());
                rest = &after[end + 1..];
            }
            None => break,
        }
    }
    names
}

/// Substitute every `${name}` using `resolve`
pub fn render<F>(template: &str, resolve: F) -> Result<String, TemplateError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or_else(|| TemplateError::Unterminated {
            template: template.to_string(),
        })?;
        let name = after[..end].trim();
        let value = resolve(name).ok_or_else(|| TemplateError::UnknownVariable {
            name: name.to_string(),
            template: template.to_string(),
        })?;
        output.push_str(&value);
        rest = &after[end + 1..];
    }

    output.push_str(rest);
    Ok(output)
}
