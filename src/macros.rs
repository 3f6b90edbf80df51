macro_rules! emit {
    ($listing:expr, $opcode:expr) => {
        $listing.instruction(format_args!("{}", $opcode))
    };

    ($listing:expr, $opcode:expr, $($format:tt)*) => {
        $listing.instruction(format_args!("{} {}", $opcode, format_args!($($format)*)))
    };
}
