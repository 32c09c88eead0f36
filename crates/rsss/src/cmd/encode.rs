use bytes::BytesMut;
use rsss_frame::encode_frame;

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_encoded, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = args.payload.resolve()?;

    let mut frame = BytesMut::new();
    encode_frame(&payload, args.tail, &mut frame).map_err(|err| frame_error("encode failed", err))?;

    print_encoded(&frame, payload.len(), args.tail, format);
    Ok(SUCCESS)
}
