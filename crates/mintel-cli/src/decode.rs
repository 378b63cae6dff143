use std::io::Read;

/// Runs the lenient decoder over a saved completion and prints the result.
///
/// # Errors
///
/// Returns an error if the input cannot be read or does not decode.
pub(crate) fn run_decode(path: &str) -> anyhow::Result<()> {
    let raw = read_input(path)?;
    match mintel_llm::decode(&raw) {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(e) => {
            let kind = if e.is_incomplete() { "incomplete" } else { "malformed" };
            anyhow::bail!("{kind} response: {e}")
        }
    }
}

fn read_input(path: &str) -> anyhow::Result<String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}
