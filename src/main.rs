use clap::{arg, crate_version, Command};
use retrocompressor::{compress, compressed_size, decompress, verify, Error, Format};

const RCH: &str = "unreachable was reached";

fn format_names() -> Vec<&'static str> {
    Format::ALL.iter().map(|f| f.name()).collect()
}

fn parse_format(s: &str) -> Result<Format, String> {
    if let Ok(idx) = s.parse::<usize>() {
        return Format::from_index(idx).ok_or_else(|| format!("no format at index {}", idx));
    }
    Format::from_name(s).ok_or_else(|| format!("unrecognised format {}", s))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let long_help = "Examples:
---------
Compress:   `dkcomp compress -f bd -i my_input -o my_output.bd`
Decompress: `dkcomp decompress -f bd -i my_output.bd -o my_input`
Size:       `dkcomp size -f bd -i my_output.bd`";

    let mut main_cmd = Command::new("dkcomp")
        .about("Compress, decompress and measure retro console data formats")
        .after_long_help(long_help)
        .version(crate_version!());

    main_cmd = main_cmd.subcommand(
        Command::new("compress")
            .arg(arg!(-f --format <FORMAT> "format name or index").value_parser(format_names()).required(true))
            .arg(arg!(-i --input <PATH> "input path").required(true))
            .arg(arg!(-o --output <PATH> "output path").required(true))
            .arg(arg!(--offset <OFFSET> "starting offset into the input file").required(false))
            .arg(arg!(--verify "re-decode the freshly compressed output and compare against the input"))
            .about("compress a file"),
    );

    main_cmd = main_cmd.subcommand(
        Command::new("decompress")
            .arg(arg!(-f --format <FORMAT> "format name or index").value_parser(format_names()).required(true))
            .arg(arg!(-i --input <PATH> "input path").required(true))
            .arg(arg!(-o --output <PATH> "output path").required(true))
            .arg(arg!(--offset <OFFSET> "starting offset into the input file").required(false))
            .about("decompress a file"),
    );

    main_cmd = main_cmd.subcommand(
        Command::new("size")
            .arg(arg!(-f --format <FORMAT> "format name or index").value_parser(format_names()).required(true))
            .arg(arg!(-i --input <PATH> "input path").required(true))
            .arg(arg!(--offset <OFFSET> "starting offset into the input file").required(false))
            .about("report the decompressed size of a compressed file without writing it out"),
    );

    let matches = main_cmd.get_matches();

    let read_offset = |cmd: &clap::ArgMatches, data: &[u8]| -> Result<usize, Box<dyn std::error::Error>> {
        match cmd.get_one::<String>("offset") {
            Some(s) => {
                let off: usize = s.parse()?;
                if off > data.len() {
                    return Err(Box::new(Error::OffsetBig));
                }
                Ok(off)
            }
            None => Ok(0),
        }
    };

    if let Some(cmd) = matches.subcommand_matches("compress") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        let format = parse_format(cmd.get_one::<String>("format").expect(RCH))?;
        let data = std::fs::read(path_in)?;
        let offset = read_offset(cmd, &data)?;
        let packed = compress(format, &data[offset..])?;
        if cmd.get_flag("verify") {
            verify(format, &data[offset..], &packed)?;
            log::info!("verify: re-decoded output matches the original input");
        }
        std::fs::write(path_out, packed)?;
    }

    if let Some(cmd) = matches.subcommand_matches("decompress") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        let format = parse_format(cmd.get_one::<String>("format").expect(RCH))?;
        let data = std::fs::read(path_in)?;
        let offset = read_offset(cmd, &data)?;
        let unpacked = decompress(format, &data[offset..])?;
        std::fs::write(path_out, unpacked)?;
    }

    if let Some(cmd) = matches.subcommand_matches("size") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let format = parse_format(cmd.get_one::<String>("format").expect(RCH))?;
        let data = std::fs::read(path_in)?;
        let offset = read_offset(cmd, &data)?;
        let size = compressed_size(format, &data[offset..])?;
        println!("{}", size);
    }

    Ok(())
}
