use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::LlmError;

/// Pull the JSON object out of a model response: the first ```json fenced
/// block if there is one, else the outermost `{ ... }` span.
pub fn extract_json_block(response: &str) -> Result<&str, LlmError> {
    if let Some(fence) = response.find("```json") {
        let start = fence + "```json".len();
        let end = response[start..]
            .find("```")
            .ok_or_else(|| LlmError::MalformedResponse("Unclosed JSON block".into()))?;
        return Ok(response[start..start + end].trim());
    }

    let start = response
        .find('{')
        .ok_or_else(|| LlmError::MalformedResponse("No JSON object found".into()))?;
    let end = response
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| LlmError::MalformedResponse("Unclosed JSON object".into()))?;
    Ok(&response[start..=end])
}

/// Extract and deserialize the JSON object in a model response.
pub fn parse_json_response<T: DeserializeOwned>(response: &str) -> Result<T, LlmError> {
    let json = extract_json_block(response)?;
    Ok(serde_json::from_str(json)?)
}

/// Parse an array leniently, skipping items that fail to deserialize.
pub fn parse_array_lenient<T: for<'de> Deserialize<'de>>(
    items: Option<&[serde_json::Value]>,
) -> Vec<T> {
    match items {
        None => vec![],
        Some(arr) => arr
            .iter()
            .filter_map(|v| serde_json::from_value(v.clone()).ok())
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Score {
        score: u32,
    }

    #[test]
    fn fenced_block_preferred() {
        let response = "Analiz aşağıdadır:\n```json\n{\"score\": 72}\n```\nBaşka not {x}";
        assert_eq!(extract_json_block(response).unwrap(), "{\"score\": 72}");
        assert_eq!(parse_json_response::<Score>(response).unwrap(), Score { score: 72 });
    }

    #[test]
    fn bare_object_with_surrounding_prose() {
        let response = "Sonuç: {\"score\": 40} bitti.";
        assert_eq!(parse_json_response::<Score>(response).unwrap(), Score { score: 40 });
    }

    #[test]
    fn missing_or_broken_json() {
        assert!(matches!(
            extract_json_block("JSON yok"),
            Err(LlmError::MalformedResponse(_))
        ));
        assert!(matches!(
            extract_json_block("```json\n{\"score\": 1}"),
            Err(LlmError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_json_response::<Score>("{\"score\": \"yüksek\"}"),
            Err(LlmError::JsonParsing(_))
        ));
    }

    #[test]
    fn lenient_array_skips_bad_items() {
        let values = vec![serde_json::json!({"score": 1}), serde_json::json!({"score": "x"})];
        let parsed: Vec<Score> = parse_array_lenient(Some(&values));
        assert_eq!(parsed, vec![Score { score: 1 }]);
        assert!(parse_array_lenient::<Score>(None).is_empty());
    }
}
