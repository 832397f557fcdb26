//! Discriminated error codes for every codec, replacing the original
//! library's global mutable error string with values the caller can match on.

/// Every stable error identifier the codecs and dispatcher can produce.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    #[error("attempted to read past end of input")]
    OobInput,
    #[error("attempted to read out of bounds of output")]
    OobOutputRead,
    #[error("attempted to write out of bounds of output")]
    OobOutputWrite,
    #[error("input is smaller than the minimum accepted size")]
    InputSmall,
    #[error("input is larger than the maximum accepted size")]
    InputLarge,
    #[error("output is smaller than the minimum accepted size")]
    OutputSmall,
    #[error("unexpected end of file")]
    EarlyEof,
    #[error("decompressed size did not match the expected size")]
    SizeWrong,

    #[error("memory allocation failed")]
    Alloc,
    #[error("failed to open input file")]
    FileInput,
    #[error("failed to open output file")]
    FileOutput,
    #[error("seek on input failed")]
    SeekInput,
    #[error("read from input file failed")]
    Fread,
    #[error("write to output file failed")]
    Fwrite,

    #[error("input buffer was null")]
    NullInput,
    #[error("offset is beyond the end of the input")]
    OffsetBig,
    #[error("offset is negative")]
    OffsetNeg,
    #[error("offset does not agree with the computed value")]
    OffsetDiff,
    #[error("format has no compressor")]
    CompNot,
    #[error("format has no decompressor")]
    DecompNot,
    #[error("input is not a recognised format")]
    BadFormat,

    #[error("format signature did not match")]
    SigWrong,
    #[error("could not auto-detect a GBA format")]
    GbaDetect,

    #[error("SD stream ended on an invalid exit condition")]
    SdBadExit,

    #[error("LZ77 backreference points before the start of output")]
    Lz77Hist,

    #[error("huffman tree is malformed")]
    HuffWrong,
    #[error("expected a huffman leaf but found an internal node")]
    HuffLeaf,
    #[error("huffman node offset exceeds the 6-bit distance budget")]
    HuffDist,
    #[error("huffman tree traversal did not terminate on a leaf")]
    HuffNoLeaf,
    #[error("huffman output size was inconsistent")]
    HuffOutsize,
    #[error("huffman tree layout required more than 8 placement stacks")]
    HuffStacks,
    #[error("a huffman placement stack overflowed its node limit")]
    HuffNodes,
    #[error("huffman tree exceeded its node capacity")]
    HuffNodeLim,
    #[error("huffman leaf value already present in the tree")]
    HuffLeafVal,

    #[error("frequency table range was invalid")]
    TableRange,
    #[error("frequency table value was invalid")]
    TableValue,
    #[error("frequency table was entirely zero")]
    TableZero,

    #[error("self-check: re-decoding the freshly compressed buffer failed")]
    VerifyDec,
    #[error("self-check: re-decoded size did not match the original")]
    VerifySize,
    #[error("self-check: re-decoded data did not match the original")]
    VerifyData,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Mirrors the original library's `get_error` surface: a static string for a code.
pub fn get_error(e: Error) -> &'static str {
    // `thiserror`'s Display is 'static text per variant, so leaking through
    // a match keeps this a zero-alloc lookup rather than a formatted String.
    match e {
        Error::OobInput => "attempted to read past end of input",
        Error::OobOutputRead => "attempted to read out of bounds of output",
        Error::OobOutputWrite => "attempted to write out of bounds of output",
        Error::InputSmall => "input is smaller than the minimum accepted size",
        Error::InputLarge => "input is larger than the maximum accepted size",
        Error::OutputSmall => "output is smaller than the minimum accepted size",
        Error::EarlyEof => "unexpected end of file",
        Error::SizeWrong => "decompressed size did not match the expected size",
        Error::Alloc => "memory allocation failed",
        Error::FileInput => "failed to open input file",
        Error::FileOutput => "failed to open output file",
        Error::SeekInput => "seek on input failed",
        Error::Fread => "read from input file failed",
        Error::Fwrite => "write to output file failed",
        Error::NullInput => "input buffer was null",
        Error::OffsetBig => "offset is beyond the end of the input",
        Error::OffsetNeg => "offset is negative",
        Error::OffsetDiff => "offset does not agree with the computed value",
        Error::CompNot => "format has no compressor",
        Error::DecompNot => "format has no decompressor",
        Error::BadFormat => "input is not a recognised format",
        Error::SigWrong => "format signature did not match",
        Error::GbaDetect => "could not auto-detect a GBA format",
        Error::SdBadExit => "SD stream ended on an invalid exit condition",
        Error::Lz77Hist => "LZ77 backreference points before the start of output",
        Error::HuffWrong => "huffman tree is malformed",
        Error::HuffLeaf => "expected a huffman leaf but found an internal node",
        Error::HuffDist => "huffman node offset exceeds the 6-bit distance budget",
        Error::HuffNoLeaf => "huffman tree traversal did not terminate on a leaf",
        Error::HuffOutsize => "huffman output size was inconsistent",
        Error::HuffStacks => "huffman tree layout required more than 8 placement stacks",
        Error::HuffNodes => "a huffman placement stack overflowed its node limit",
        Error::HuffNodeLim => "huffman tree exceeded its node capacity",
        Error::HuffLeafVal => "huffman leaf value already present in the tree",
        Error::TableRange => "frequency table range was invalid",
        Error::TableValue => "frequency table value was invalid",
        Error::TableZero => "frequency table was entirely zero",
        Error::VerifyDec => "self-check: re-decoding the freshly compressed buffer failed",
        Error::VerifySize => "self-check: re-decoded size did not match the original",
        Error::VerifyData => "self-check: re-decoded data did not match the original",
    }
}
