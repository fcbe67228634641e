/// Returns up to the first `n` lines of the given string.
pub fn first_lines(input: &str, n: usize) -> String {
    let lines: Vec<&str> = input.split('\n').collect();
    if lines.len() <= n {
        return input.to_string();
    }
    lines[..n].join("\n")
}
