use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "parsers/zfs.pest"] // relative to src
pub struct ZfsParser;
