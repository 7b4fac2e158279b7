use colored::*;
use doctor_core::{ConversationTurn, HospitalRecord, Speaker};
use pulldown_cmark::{Event as MdEvent, HeadingLevel, Options, Parser as MdParser, Tag};

pub const DISCLAIMER: &str = "This app provides general health information and is not a substitute for \
professional medical advice, diagnosis, or treatment. Always seek the advice \
of your physician or other qualified health provider.";

pub const NO_HOSPITALS: &str = "No hospitals found in the selected area. Try increasing the radius.";

/// Print one conversation turn with a colored speaker label
pub fn print_turn(turn: &ConversationTurn) {
    match turn.speaker {
        Speaker::User => println!("{}: {}", turn.speaker.display_label().green().bold(), turn.text),
        Speaker::Assistant => println!(
            "{}: {}",
            turn.speaker.display_label().blue().bold(),
            render_markdown(&turn.text)
        ),
    }
}

/// Re-render the whole conversation
pub fn print_conversation(turns: &[ConversationTurn]) {
    if turns.is_empty() {
        println!("{}", "No messages yet.".dimmed());
        return;
    }
    for turn in turns {
        print_turn(turn);
        println!();
    }
}

pub fn print_disclaimer() {
    println!("{}", "Disclaimer".yellow().bold());
    println!("{}", DISCLAIMER.yellow());
    println!();
}

/// Plain-text lines for one entry of the hospital list (1-based `position`)
pub fn format_hospital_entry(position: usize, hospital: &HospitalRecord) -> Vec<String> {
    let mut lines = vec![
        format!("{}. {}", position, hospital.name),
        format!("📞 {}", hospital.phone),
        format!("📍 {}", hospital.address),
    ];
    if hospital.has_phone() {
        lines.push(format!("Call: tel:{}", hospital.phone));
    }
    lines
}

pub fn print_hospital_list(hospitals: &[HospitalRecord]) {
    if hospitals.is_empty() {
        println!("{}", NO_HOSPITALS.cyan());
        return;
    }

    println!("{}", "Hospital List".yellow().bold());
    for (i, hospital) in hospitals.iter().enumerate() {
        let mut lines = format_hospital_entry(i + 1, hospital).into_iter();
        if let Some(title) = lines.next() {
            println!("{}", title.bold());
        }
        for line in lines {
            println!("   {}", line);
        }
        println!("{}", "─".repeat(40).dimmed());
    }
}

pub fn print_models(models: &[String]) {
    println!("{}", "Available models:".cyan());
    for model in models {
        println!("- {}", model);
    }
}

/// Show usage instructions for the interactive session
pub fn print_usage_instructions() {
    let commands = [
        ("/hospitals [lat lon [radius]]", "Search for hospitals (defaults from config)"),
        ("/hospitals ?", "Search for hospitals, asking for the location"),
        ("/map [file]", "Write the last search results as an HTML map"),
        ("/models", "List models exposed by the API"),
        ("/model", "Choose a different model"),
        ("/key", "Enter a different API key"),
        ("/history", "Show the conversation so far"),
        ("/clear", "Start a new conversation"),
        ("/disclaimer", "Show the medical disclaimer"),
        ("exit", "End the session"),
    ];

    println!("{}", "Type your symptoms and press Enter. Commands:".yellow().bold());
    for (command, description) in commands {
        println!("  {:<31} {}", command.green(), description);
    }
    println!();
}

/// Render markdown in the terminal
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = MdParser::new_ext(markdown, options);

    let mut output = String::new();
    let mut strong = false;
    let mut emphasis = false;
    let mut in_code_block = false;
    // One entry per open list: Some(next number) for ordered lists
    let mut lists: Vec<Option<u64>> = Vec::new();

    for event in parser {
        match event {
            MdEvent::Start(Tag::Heading(level, ..)) => {
                if !output.is_empty() && !output.ends_with('\n') {
                    output.push('\n');
                }
                match level {
                    HeadingLevel::H1 | HeadingLevel::H2 => {
                        output.push_str(&format!("{} ", "#".bright_cyan().bold()))
                    }
                    _ => {}
                }
                strong = true;
            }
            MdEvent::End(Tag::Heading(..)) => {
                strong = false;
                output.push('\n');
            }
            MdEvent::Start(Tag::Paragraph) => {}
            MdEvent::End(Tag::Paragraph) => {
                // Paragraphs inside list items stay on the item's line
                if lists.is_empty() {
                    output.push_str("\n\n");
                } else {
                    output.push(' ');
                }
            }
            MdEvent::Start(Tag::List(start)) => {
                if !output.is_empty() && !output.ends_with('\n') {
                    output.push('\n');
                }
                lists.push(start);
            }
            MdEvent::End(Tag::List(_)) => {
                lists.pop();
                if lists.is_empty() {
                    output.push('\n');
                }
            }
            MdEvent::Start(Tag::Item) => {
                if !output.is_empty() && !output.ends_with('\n') {
                    output.push('\n');
                }
                let depth = lists.len().saturating_sub(1);
                output.push_str(&"  ".repeat(depth));
                match lists.last_mut() {
                    Some(Some(n)) => {
                        output.push_str(&format!("{} ", format!("{}.", n).yellow()));
                        *n += 1;
                    }
                    _ => output.push_str(&format!("{} ", "•".yellow())),
                }
            }
            MdEvent::End(Tag::Item) => {
                let trimmed = output.trim_end_matches(' ').len();
                output.truncate(trimmed);
                if !output.ends_with('\n') {
                    output.push('\n');
                }
            }
            MdEvent::Start(Tag::CodeBlock(_)) => {
                in_code_block = true;
                output.push('\n');
            }
            MdEvent::End(Tag::CodeBlock(_)) => {
                in_code_block = false;
                output.push('\n');
            }
            MdEvent::Start(Tag::Strong) => strong = true,
            MdEvent::End(Tag::Strong) => strong = false,
            MdEvent::Start(Tag::Emphasis) => emphasis = true,
            MdEvent::End(Tag::Emphasis) => emphasis = false,
            MdEvent::Code(code) => {
                output.push_str(&format!("{}", code.on_bright_black().white()));
            }
            MdEvent::Text(text) => {
                if in_code_block {
                    output.push_str(&format!("{}", text.dimmed()));
                } else if strong {
                    output.push_str(&format!("{}", text.bold()));
                } else if emphasis {
                    output.push_str(&format!("{}", text.italic()));
                } else {
                    output.push_str(&text);
                }
            }
            MdEvent::SoftBreak => output.push(' '),
            MdEvent::HardBreak => output.push('\n'),
            MdEvent::Rule => {
                output.push_str(&"─".repeat(40).dimmed().to_string());
                output.push('\n');
            }
            MdEvent::Html(html) => output.push_str(&html),
            _ => {}
        }
    }

    output.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(markdown: &str) -> String {
        colored::control::set_override(false);
        render_markdown(markdown)
    }

    fn general_hospital(phone: &str) -> HospitalRecord {
        HospitalRecord {
            name: "General Hospital".to_string(),
            phone: phone.to_string(),
            latitude: 37.78,
            longitude: -122.41,
            address: "Address not available".to_string(),
        }
    }

    #[test]
    fn test_hospital_entry_with_phone() {
        let lines = format_hospital_entry(1, &general_hospital("555-1234"));
        assert_eq!(
            lines,
            vec![
                "1. General Hospital",
                "📞 555-1234",
                "📍 Address not available",
                "Call: tel:555-1234",
            ]
        );
    }

    #[test]
    fn test_hospital_entry_without_phone_has_no_call_link() {
        let lines = format_hospital_entry(3, &general_hospital("N/A"));
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "3. General Hospital");
        assert_eq!(lines[1], "📞 N/A");
    }

    #[test]
    fn test_render_ordered_list() {
        let rendered = plain("Possible causes:\n\n1. Cold\n2. Flu\n");
        assert_eq!(rendered, "Possible causes:\n\n1. Cold\n2. Flu");
    }

    #[test]
    fn test_render_bullets_and_strong() {
        let rendered = plain("**Next steps**\n\n- Rest\n- Fluids");
        assert_eq!(rendered, "Next steps\n\n• Rest\n• Fluids");
    }

    #[test]
    fn test_render_heading() {
        let rendered = plain("### When to seek care\nCall 911 if breathing is hard.");
        assert_eq!(rendered, "When to seek care\nCall 911 if breathing is hard.");
    }
}
