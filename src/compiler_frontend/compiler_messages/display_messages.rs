use crate::compiler_frontend::compiler_errors::{
    CompilerError, CompilerMessages, ErrorMetaDataKey, ErrorType, error_type_to_str,
};
use saying::say;

pub fn print_compiler_messages(messages: CompilerMessages) {
    for err in messages.errors {
        print_formatted_error(err);
    }

    for warning in messages.warnings {
        say!(Yellow "Warning: ", warning);
    }
}

pub fn print_formatted_error(e: CompilerError) {
    let heading = error_type_to_str(&e.error_type);

    match e.error_type {
        ErrorType::InvariantViolation | ErrorType::Unimplemented => {
            say!(Red "\n", heading);
            say!(Dark Magenta "This is a compiler bug, not a problem with your code");
        }
        ErrorType::Config | ErrorType::File => {
            say!(Red "\n", heading);
        }
    }

    let location = e.location.to_string();
    say!(Bright Black location);
    let message = &e.msg;
    say!(message);

    let mut metadata: Vec<(&ErrorMetaDataKey, &String)> = e.metadata.iter().collect();
    metadata.sort_by_key(|(key, _)| format!("{key:?}"));
    for (key, value) in metadata {
        let label = format!("  {key:?}: ");
        say!(Bright Black label, value);
    }
}
