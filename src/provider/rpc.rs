use std::time::Duration;

use alloy::{
    contract::Error as ContractError,
    eips::BlockId,
    primitives::{Address, FixedBytes, U256},
    providers::{DynProvider, Provider, ProviderBuilder},
    sol,
};
use async_trait::async_trait;
use bigdecimal::num_bigint::{BigInt, Sign};
use tokio::time::timeout;
use tracing::debug;
use url::Url;

use crate::{
    configuration::Config,
    error::{Error, ReadFailure},
};

use super::chain_reader::{ChainReader, TypedValue, View_Function};

sol! {
    #[sol(rpc)]
    interface ICToken {
        function accrualBlockNumber() external view returns (uint256);
        function totalSupply() external view returns (uint256);
        function exchangeRateStored() external view returns (uint256);
        function totalReserves() external view returns (uint256);
        function totalBorrows() external view returns (uint256);
        function borrowIndex() external view returns (uint256);
        function borrowRatePerBlock() external view returns (uint256);
        function supplyRatePerBlock() external view returns (uint256);
        function getCash() external view returns (uint256);
        function underlying() external view returns (address);
    }

    #[sol(rpc)]
    interface IERC20Metadata {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
    }

    // Pre-standard tokens (MKR, SAI) return bytes32 metadata.
    #[sol(rpc)]
    interface IERC20Bytes32 {
        function name() external view returns (bytes32);
        function symbol() external view returns (bytes32);
    }

    #[sol(rpc)]
    interface IPriceOracle {
        function getUnderlyingPrice(address cToken) external view returns (uint256);
    }

    #[sol(rpc)]
    interface ILegacyPriceOracle {
        function getPrice(address asset) external view returns (uint256);
    }
}

/// `ChainReader` backed by an Ethereum JSON-RPC node.
#[derive(Clone)]
pub struct Rpc {
    provider: DynProvider,
    url: Url,
    timeout: Duration,
}

impl Rpc {
    pub fn new(config: &Config) -> Result<Rpc, Error> {
        let url = Url::parse(&config.rpc_host)?;
        let provider = ProviderBuilder::new().connect_http(url.clone()).erased();

        Ok(Rpc {
            provider,
            url,
            timeout: Duration::from_secs(config.timeout),
        })
    }

    async fn call(
        &self,
        contract: Address,
        function: &View_Function,
        block: BlockId,
    ) -> Result<TypedValue, ReadFailure> {
        let provider = self.provider.clone();
        let ctoken = ICToken::new(contract, provider.clone());
        let token = IERC20Metadata::new(contract, provider.clone());

        let value = match function {
            View_Function::AccrualBlockNumber => uint(
                ctoken
                    .accrualBlockNumber()
                    .block(block)
                    .call()
                    .await
                    .map_err(read_failure)?,
            ),
            View_Function::TotalSupply => uint(
                ctoken
                    .totalSupply()
                    .block(block)
                    .call()
                    .await
                    .map_err(read_failure)?,
            ),
            View_Function::ExchangeRateStored => uint(
                ctoken
                    .exchangeRateStored()
                    .block(block)
                    .call()
                    .await
                    .map_err(read_failure)?,
            ),
            View_Function::TotalReserves => uint(
                ctoken
                    .totalReserves()
                    .block(block)
                    .call()
                    .await
                    .map_err(read_failure)?,
            ),
            View_Function::TotalBorrows => uint(
                ctoken
                    .totalBorrows()
                    .block(block)
                    .call()
                    .await
                    .map_err(read_failure)?,
            ),
            View_Function::BorrowIndex => uint(
                ctoken
                    .borrowIndex()
                    .block(block)
                    .call()
                    .await
                    .map_err(read_failure)?,
            ),
            View_Function::BorrowRatePerBlock => uint(
                ctoken
                    .borrowRatePerBlock()
                    .block(block)
                    .call()
                    .await
                    .map_err(read_failure)?,
            ),
            View_Function::SupplyRatePerBlock => uint(
                ctoken
                    .supplyRatePerBlock()
                    .block(block)
                    .call()
                    .await
                    .map_err(read_failure)?,
            ),
            View_Function::GetCash => uint(
                ctoken
                    .getCash()
                    .block(block)
                    .call()
                    .await
                    .map_err(read_failure)?,
            ),
            View_Function::Underlying => address(
                ctoken
                    .underlying()
                    .block(block)
                    .call()
                    .await
                    .map_err(read_failure)?,
            ),
            View_Function::Decimals => TypedValue::Uint(BigInt::from(
                token
                    .decimals()
                    .block(block)
                    .call()
                    .await
                    .map_err(read_failure)?,
            )),
            View_Function::Name => {
                match token.name().block(block).call().await.map_err(read_failure) {
                    Err(ReadFailure::Decode(_)) => {
                        let legacy = IERC20Bytes32::new(contract, provider);
                        text(
                            legacy
                                .name()
                                .block(block)
                                .call()
                                .await
                                .map_err(read_failure)?,
                        )?
                    },
                    result => TypedValue::Text(result?),
                }
            },
            View_Function::Symbol => {
                match token.symbol().block(block).call().await.map_err(read_failure) {
                    Err(ReadFailure::Decode(_)) => {
                        let legacy = IERC20Bytes32::new(contract, provider);
                        text(
                            legacy
                                .symbol()
                                .block(block)
                                .call()
                                .await
                                .map_err(read_failure)?,
                        )?
                    },
                    result => TypedValue::Text(result?),
                }
            },
            View_Function::GetUnderlyingPrice(market) => {
                let oracle = IPriceOracle::new(contract, provider);
                uint(
                    oracle
                        .getUnderlyingPrice(parse_address(market)?)
                        .block(block)
                        .call()
                        .await
                        .map_err(read_failure)?,
                )
            },
            View_Function::GetPrice(asset) => {
                let oracle = ILegacyPriceOracle::new(contract, provider);
                uint(
                    oracle
                        .getPrice(parse_address(asset)?)
                        .block(block)
                        .call()
                        .await
                        .map_err(read_failure)?,
                )
            },
        };

        Ok(value)
    }
}

fn parse_address(value: &str) -> Result<Address, ReadFailure> {
    value
        .parse::<Address>()
        .map_err(|e| ReadFailure::Decode(format!("argument {}: {}", value, e)))
}

fn uint(value: U256) -> TypedValue {
    TypedValue::Uint(BigInt::from_bytes_be(
        Sign::Plus,
        &value.to_be_bytes::<32>(),
    ))
}

fn address(value: Address) -> TypedValue {
    TypedValue::Address(format!("0x{}", hex::encode(value.as_slice())))
}

/// Right-padded `bytes32` text, cut at the first zero byte.
fn text(value: FixedBytes<32>) -> Result<TypedValue, ReadFailure> {
    let bytes = value.as_slice();
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());

    String::from_utf8(bytes[..end].to_vec())
        .map(TypedValue::Text)
        .map_err(|e| ReadFailure::Decode(e.to_string()))
}

/// Node error responses mean the call executed and failed; anything else
/// on the wire is a transport problem.
fn read_failure(err: ContractError) -> ReadFailure {
    match err {
        ContractError::TransportError(err) => match err.as_error_resp() {
            Some(payload) => ReadFailure::Reverted(payload.message.to_string()),
            None => ReadFailure::Transport(err.to_string()),
        },
        err @ ContractError::ZeroData(..) => ReadFailure::Reverted(err.to_string()),
        err @ ContractError::AbiError(_) => ReadFailure::Decode(err.to_string()),
        err => ReadFailure::Transport(err.to_string()),
    }
}

#[async_trait]
impl ChainReader for Rpc {
    async fn read(
        &self,
        contract: &str,
        function: &View_Function,
        block: i64,
    ) -> Result<TypedValue, ReadFailure> {
        let target = parse_address(contract)?;
        let number = u64::try_from(block)
            .map_err(|_| ReadFailure::Decode(format!("block {}", block)))?;
        debug!("eth_call {} {} at {}", contract, function, block);

        timeout(
            self.timeout,
            self.call(target, function, BlockId::number(number)),
        )
        .await
        .map_err(|_| {
            ReadFailure::Transport(format!(
                "{} {} timed out after {:?}",
                contract, function, self.timeout
            ))
        })?
    }
}
