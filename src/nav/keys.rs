/// Identity of a rendered action form: at most one form exists per key.
pub fn form_key(step_euid: &str, action: &str, action_group: &str) -> String {
    format!("{step_euid}-{action}{action_group}-form")
}

/// Identity of a repeatable-field entry list inside a form.
pub fn list_key(step_euid: &str, field: &str) -> String {
    format!("list-{step_euid}-{field}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_key_concatenates_step_action_and_group() {
        assert_eq!(form_key("ST7", "print_label", "core"), "ST7-print_labelcore-form");
    }

    #[test]
    fn list_key_names_step_and_field() {
        assert_eq!(list_key("ST7", "barcodes"), "list-ST7-barcodes");
    }
}
