use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::Result;
use crate::stream::utf8::Utf8Decoder;
use crate::tts::streamer::{SpeechSink, TtsStreamer};

const READ_CHUNK: usize = 4096;

/// Stream raw text from `reader` into `streamer` as it arrives and flush at EOF.
/// Returns the number of utterances spoken.
pub async fn pump_reader<R, S>(reader: &mut R, streamer: &mut TtsStreamer<S>) -> Result<usize>
where
    R: AsyncRead + Unpin,
    S: SpeechSink,
{
    let mut decoder = Utf8Decoder::new();
    let mut buf = vec![0u8; READ_CHUNK];
    let mut spoken = 0;

    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        let text = decoder.decode(&buf[..n]);
        spoken += streamer.ingest(&text);
    }

    spoken += streamer.ingest(&decoder.finish());
    spoken += streamer.flush();
    Ok(spoken)
}
