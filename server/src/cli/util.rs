use std::io::Write;
use std::str::FromStr;

/// Ask the user interactively for some single-line value in the terminal, if it has not been given
/// on the command line. The user's input is converted to type [T]. In case of an error, the error
/// is printed and the user is queried again with same prompt until the entered value is parsed
/// successfully.
pub fn value_or_query_user<T: FromStr>(value: Option<T>, prompt: &str) -> T
where
    <T as FromStr>::Err: std::fmt::Display,
{
    if let Some(value) = value {
        return value;
    }
    loop {
        let user_input = prompt_line(prompt);
        match user_input.trim().parse() {
            Ok(value) => return value,
            Err(e) => println!("Error: {}", e),
        }
    }
}

/// Ask the user interactively for a non-empty name, if it has not been given on the command line.
pub fn name_or_query_user(value: Option<String>, prompt: &str) -> String {
    if let Some(value) = value {
        return value;
    }
    loop {
        let user_input = prompt_line(prompt);
        if !user_input.trim().is_empty() {
            return user_input.trim().to_owned();
        }
        println!("Error: The name must not be empty.");
    }
}

/// Ask the user interactively for a confirmation in the terminal (entered as y/n). The user is
/// queried again until they enter a valid answer.
pub fn query_user_bool(prompt: &str, default: Option<bool>) -> bool {
    let value_help = match default {
        Some(true) => "Y/n",
        Some(false) => "y/N",
        None => "y/n",
    };
    loop {
        match prompt_line(&format!("{} [{}]", prompt, value_help))
            .trim()
            .to_lowercase()
            .as_str()
        {
            "y" => return true,
            "n" => return false,
            "" => {
                if let Some(default) = default {
                    return default;
                }
            }
            _ => {}
        }
        println!("Error: unknown option. Please enter 'y' or 'n'.");
    }
}

fn prompt_line(prompt: &str) -> String {
    println!("{}:", prompt);
    print!("> ");
    // A failed flush only affects the prompt's visibility
    let _ = std::io::stdout().flush();
    let mut user_input = String::new();
    if let Err(e) = std::io::stdin().read_line(&mut user_input) {
        println!("Error: {}", e);
    }
    user_input
}
