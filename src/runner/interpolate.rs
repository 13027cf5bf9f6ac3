//! Variable interpolation for strings
//!
//! `${name}` is replaced by the context variable `name`, falling back to the
//! process environment. Values are expanded recursively.

use crate::error::{InterpolationError, InterpolationResult};
use regex::Regex;
use std::collections::HashMap;
use std::env;
use std::sync::OnceLock;

static PATTERN: OnceLock<Regex> = OnceLock::new();

fn pattern() -> InterpolationResult<&'static Regex> {
    if let Some(re) = PATTERN.get() {
        return Ok(re);
    }
    let re = Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| InterpolationError::InvalidSyntax(e.to_string()))?;
    Ok(PATTERN.get_or_init(|| re))
}

/// Interpolate variables in a string
///
/// Unknown variables are left as they are.
pub fn interpolate(s: &str, vars: &HashMap<String, String>) -> InterpolationResult<String> {
    expand(s, vars, &mut Vec::new())
}

fn expand(
    s: &str,
    vars: &HashMap<String, String>,
    stack: &mut Vec<String>,
) -> InterpolationResult<String> {
    let re = pattern()?;
    let mut result = String::with_capacity(s.len());
    let mut last = 0;

    for caps in re.captures_iter(s) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        result.push_str(&s[last..whole.start()]);
        last = whole.end();

        let name = name.as_str();
        let Some(value) = lookup(name, vars) else {
            result.push_str(whole.as_str());
            continue;
        };

        if stack.iter().any(|seen| seen == name) {
            return Err(InterpolationError::RecursiveInterpolation);
        }
        stack.push(name.to_string());
        result.push_str(&expand(&value, vars, stack)?);
        stack.pop();
    }

    result.push_str(&s[last..]);
    Ok(result)
}

fn lookup(name: &str, vars: &HashMap<String, String>) -> Option<String> {
    vars.get(name).cloned().or_else(|| env::var(name).ok())
}

/// Interpolate with strict mode - errors on undefined variables
pub fn interpolate_strict(
    s: &str,
    vars: &HashMap<String, String>,
) -> InterpolationResult<String> {
    let result = interpolate(s, vars)?;

    if let Some(name) = pattern()?.captures(&result).and_then(|caps| caps.get(1)) {
        return Err(InterpolationError::UndefinedVariable(name.as_str().to_string()));
    }

    Ok(result)
}

/// Interpolate a list of strings strictly
pub fn interpolate_list(
    list: &[String],
    vars: &HashMap<String, String>,
) -> InterpolationResult<Vec<String>> {
    list.iter().map(|s| interpolate_strict(s, vars)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_interpolation() {
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "world".to_string());

        let result = interpolate("Hello, ${name}!", &vars).unwrap();
        assert_eq!(result, "Hello, world!");
    }

    #[test]
    fn test_multiple_variables() {
        let mut vars = HashMap::new();
        vars.insert("first".to_string(), "John".to_string());
        vars.insert("last".to_string(), "Doe".to_string());

        let result = interpolate("${first} ${last}", &vars).unwrap();
        assert_eq!(result, "John Doe");
    }

    #[test]
    fn test_environment_variable() {
        env::set_var("TEST_VAR_BRISK", "test_value");

        let vars = HashMap::new();
        let result = interpolate("Value: ${TEST_VAR_BRISK}", &vars).unwrap();
        assert_eq!(result, "Value: test_value");

        env::remove_var("TEST_VAR_BRISK");
    }

    #[test]
    fn test_undefined_variable_lenient() {
        let vars = HashMap::new();
        let result = interpolate("Hello, ${undefined}!", &vars).unwrap();
        assert_eq!(result, "Hello, ${undefined}!");
    }

    #[test]
    fn test_undefined_variable_strict() {
        let vars = HashMap::new();
        let result = interpolate_strict("Hello, ${undefined}!", &vars);
        assert!(matches!(
            result,
            Err(InterpolationError::UndefinedVariable(name)) if name == "undefined"
        ));
    }

    #[test]
    fn test_nested_interpolation() {
        let mut vars = HashMap::new();
        vars.insert("inner".to_string(), "value".to_string());
        vars.insert("outer".to_string(), "${inner}".to_string());

        let result = interpolate("Result: ${outer}", &vars).unwrap();
        assert_eq!(result, "Result: value");
    }

    #[test]
    fn test_same_variable_twice_is_not_recursion() {
        let mut vars = HashMap::new();
        vars.insert("v".to_string(), "1".to_string());

        assert_eq!(interpolate("${v}.${v}", &vars).unwrap(), "1.1");
    }

    #[test]
    fn test_recursive_interpolation() {
        let mut vars = HashMap::new();
        vars.insert("a".to_string(), "${b}".to_string());
        vars.insert("b".to_string(), "${a}".to_string());

        assert!(matches!(
            interpolate("${a}", &vars),
            Err(InterpolationError::RecursiveInterpolation)
        ));
    }

    #[test]
    fn test_interpolate_list() {
        let mut vars = HashMap::new();
        vars.insert("name".to_string(), "test".to_string());

        let list = vec!["file-${name}.txt".to_string(), "static.txt".to_string()];

        let result = interpolate_list(&list, &vars).unwrap();
        assert_eq!(result, vec!["file-test.txt", "static.txt"]);
    }

    #[test]
    fn test_empty_variable_name() {
        let vars = HashMap::new();
        let result = interpolate("Value: ${}", &vars).unwrap();
        assert_eq!(result, "Value: ${}");
    }
}
